use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lowest rating a participant can give a topic
pub const LOWEST_RATING: u8 = 1;
/// A rating of 6 means the participant volunteers to lead the topic
pub const VOLUNTEER_RATING: u8 = 6;

/// An enumeration of errors that may occur while reading an interests table
#[derive(Debug, thiserror::Error)]
pub enum InterestsErr {
    #[error("Interests file {} not found", .0.display())]
    NotFound(PathBuf),
    #[error("Interests io failed: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Malformed interests CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Interests header has no topic columns")]
    NoTopics,
    #[error("Participant '{0}' appears more than once")]
    DuplicateName(String),
    #[error("Topic column '{0}' appears more than once")]
    DuplicateTopic(String),
    #[error("Invalid rating '{value}' for '{column}' on line {line}, expected 1-6")]
    InvalidRating {
        line: usize,
        column: String,
        value: String,
    },
}

/// One row of the interests table
///
/// `ratings` has one entry per topic column, `None` where the cell was left blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub ratings: Vec<Option<u8>>,
}

impl Participant {
    pub fn new(name: impl Into<String>, ratings: Vec<Option<u8>>) -> Self {
        Self {
            name: name.into(),
            ratings,
        }
    }

    pub fn rating(&self, topic_idx: usize) -> Option<u8> {
        self.ratings.get(topic_idx).copied().flatten()
    }

    pub fn max_rating(&self) -> Option<u8> {
        self.ratings.iter().flatten().max().copied()
    }

    /// Returns the indices of the participant's favourite topics.
    ///
    /// Only ratings strictly above `min_rating` count. The result is ordered by rating
    /// (highest first), ties keep column order, and holds at most `n` topics.
    pub fn top_interests(&self, n: usize, min_rating: u8) -> Vec<usize> {
        let mut rated: Vec<(usize, u8)> = self.ratings
            .iter()
            .enumerate()
            .filter_map(|(idx, rating)| rating.map(|r| (idx, r)))
            .filter(|&(_, rating)| rating > min_rating)
            .collect();

        // sort_by is stable so equal ratings stay in column order
        rated.sort_by(|a, b| b.1.cmp(&a.1));
        rated.truncate(n);
        rated.into_iter().map(|(idx, _)| idx).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopInterests {
    pub name: String,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volunteer {
    pub name: String,
    pub topics: Vec<String>,
}

/// Participant names and their per-topic ratings, as read from the interests CSV.
///
/// The first CSV column holds the participant name, every other column is a topic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterestTable {
    pub topics: Vec<String>,
    pub participants: Vec<Participant>,
}

impl InterestTable {
    /// Reads an interests table from a CSV file.
    ///
    /// # Errors
    /// Returns `InterestsErr::NotFound` when the file does not exist, and the errors of
    /// [`InterestTable::from_reader`] for anything wrong with its contents.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InterestsErr> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(InterestsErr::NotFound(path.to_path_buf()));
            },
            Err(e) => return Err(e.into()),
        };

        let table = Self::from_reader(file)?;
        info!("Read {} participants and {} topics from {}", table.len(), table.topics.len(), path.display());
        Ok(table)
    }

    /// Parses an interests table from any CSV source.
    ///
    /// # Errors
    /// - the header has no topic columns
    /// - a row has a different number of cells than the header
    /// - a topic column is repeated
    /// - a participant name is repeated
    /// - a rating is not a whole number between 1 and 6
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, InterestsErr> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let topics: Vec<String> = headers.iter().skip(1).map(str::to_owned).collect();
        if topics.is_empty() {
            return Err(InterestsErr::NoTopics);
        }
        let mut seen_topics = HashSet::new();
        if let Some(topic) = topics.iter().find(|topic| !seen_topics.insert(topic.as_str())) {
            return Err(InterestsErr::DuplicateTopic(topic.clone()));
        }

        let mut seen_names = HashSet::new();
        let mut participants = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            // header is line 1
            let line = idx + 2;

            let name = record.get(0).unwrap_or_default();
            if name.is_empty() {
                debug!("skipping line {} without a participant name", line);
                continue;
            }
            if !seen_names.insert(name.to_owned()) {
                return Err(InterestsErr::DuplicateName(name.to_owned()));
            }

            let ratings = topics
                .iter()
                .enumerate()
                .map(|(col, topic)| parse_rating(record.get(col + 1).unwrap_or_default(), line, topic))
                .collect::<Result<Vec<_>, _>>()?;

            participants.push(Participant::new(name, ratings));
        }

        Ok(Self { topics, participants })
    }

    /// Writes the table back out as CSV with a `Name` header column.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), InterestsErr> {
        let mut writer = csv::Writer::from_writer(writer);

        writer.write_record(std::iter::once("Name").chain(self.topics.iter().map(String::as_str)))?;
        for participant in &self.participants {
            let mut record = vec![participant.name.clone()];
            record.extend(participant.ratings
                .iter()
                .map(|rating| rating.map(|r| r.to_string()).unwrap_or_default()));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.name.as_str())
    }

    pub fn topic_index(&self, topic: &str) -> Option<usize> {
        self.topics.iter().position(|t| t == topic)
    }

    pub fn participant(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.name == name)
    }

    pub fn rating(&self, name: &str, topic: &str) -> Option<u8> {
        let topic_idx = self.topic_index(topic)?;
        self.participant(name)?.rating(topic_idx)
    }

    /// Every participant's top `n` topics rated above `min_rating`, in table order.
    pub fn top_interests(&self, n: usize, min_rating: u8) -> Vec<TopInterests> {
        self.participants
            .iter()
            .map(|participant| TopInterests {
                name: participant.name.clone(),
                topics: participant
                    .top_interests(n, min_rating)
                    .into_iter()
                    .map(|idx| self.topics[idx].clone())
                    .collect(),
            })
            .collect()
    }

    /// Participants who gave at least one topic a 6, with the topics they volunteered for.
    pub fn volunteers(&self) -> Vec<Volunteer> {
        self.participants
            .iter()
            .filter_map(|participant| {
                let topics: Vec<String> = self.topics
                    .iter()
                    .enumerate()
                    .filter(|&(idx, _)| participant.rating(idx) == Some(VOLUNTEER_RATING))
                    .map(|(_, topic)| topic.clone())
                    .collect();

                (!topics.is_empty()).then(|| Volunteer {
                    name: participant.name.clone(),
                    topics,
                })
            })
            .collect()
    }
}

fn parse_rating(cell: &str, line: usize, column: &str) -> Result<Option<u8>, InterestsErr> {
    if cell.is_empty() {
        return Ok(None);
    }

    let invalid = || InterestsErr::InvalidRating {
        line,
        column: column.to_owned(),
        value: cell.to_owned(),
    };

    // Spreadsheet exports sometimes write whole numbers as "5.0"
    let rating = match cell.parse::<u8>() {
        Ok(rating) => rating,
        Err(_) => {
            let float = cell.parse::<f64>().map_err(|_| invalid())?;
            if float.fract() != 0.0 || !(0.0..=f64::from(u8::MAX)).contains(&float) {
                return Err(invalid());
            }
            float as u8
        },
    };

    if !(LOWEST_RATING..=VOLUNTEER_RATING).contains(&rating) {
        return Err(invalid());
    }

    Ok(Some(rating))
}
