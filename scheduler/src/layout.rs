use crate::groups::TopicGroups;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

#[derive(Debug, thiserror::Error)]
pub enum LayoutErr {
    #[error("Layout file {} not found", .0.display())]
    NotFound(PathBuf),
    #[error("Layout io failed: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Layout JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Layout has no sessions")]
    Empty,
    #[error("Session key '{0}' is not a session number")]
    BadSessionNumber(String),
    #[error("Session {0} appears more than once in the layout")]
    DuplicateSession(u32),
    #[error("Session {session} lists topic '{topic}' more than once")]
    DuplicateTopic { session: u32, topic: String },
    #[error("A random layout needs at least one topic, one session and one topic per session")]
    InvalidShape,
}

/// One parallel time slot and the topics that run during it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSlot {
    pub number: u32,
    pub topics: Vec<String>,
}

/// Accepted shapes of a layout file
///
/// Either `{"1": ["AI", "Labs"], "2": [...]}` or `[{"number": 1, "topics": [...]}, ...]`
#[derive(Deserialize)]
#[serde(untagged)]
enum LayoutFile {
    Numbered(BTreeMap<String, Vec<String>>),
    Slots(Vec<SessionSlot>),
}

/// Which topics run in which session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionLayout {
    pub sessions: Vec<SessionSlot>,
}

const PREDEFINED_SESSIONS: [&[&str]; 4] = [
    &["Hardware Development", "AI", "Software Development", "Statistical Methods", "Modeling Systems", "New physics at colliders", "How to PhD"],
    &["Labs", "AI", "Software Development", "Statistical Methods", "Dark Matter", "Time Management", "How to PhD"],
    &["FPGA Development", "AI", "Analytical Methods", "Statistical Methods", "Dark Matter", "Time Management", "Outreach"],
    &["Automation", "Software Development", "Analytical Methods", "Modeling Systems", "New physics at colliders", "Addressing Power Abuse", "Non-Scientific Topics"],
];

impl SessionLayout {
    pub fn new(sessions: Vec<SessionSlot>) -> Result<Self, LayoutErr> {
        let layout = Self { sessions };
        layout.check_shape()?;
        Ok(layout)
    }

    /// The built-in four session layout of seven topics each.
    pub fn predefined() -> Self {
        Self {
            sessions: PREDEFINED_SESSIONS
                .iter()
                .zip(1..)
                .map(|(topics, number)| SessionSlot {
                    number,
                    topics: topics.iter().map(|t| (*t).to_owned()).collect(),
                })
                .collect(),
        }
    }

    /// Every distinct topic of the built-in layout, in first-seen order.
    pub fn predefined_topics() -> Vec<String> {
        Self::predefined().distinct_topics()
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, LayoutErr> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LayoutErr::NotFound(path.to_path_buf()));
            },
            Err(e) => return Err(e.into()),
        };

        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> Result<Self, LayoutErr> {
        let sessions = match serde_json::from_str::<LayoutFile>(json)? {
            LayoutFile::Numbered(map) => {
                let mut slots = map
                    .into_iter()
                    .map(|(key, topics)| {
                        let number = key.trim().parse::<u32>().map_err(|_| LayoutErr::BadSessionNumber(key))?;
                        Ok(SessionSlot { number, topics })
                    })
                    .collect::<Result<Vec<_>, LayoutErr>>()?;
                // keys sort as strings, so "10" would land before "2"
                slots.sort_by_key(|slot| slot.number);
                slots
            },
            LayoutFile::Slots(slots) => slots,
        };

        Self::new(sessions)
    }

    /// Deals shuffled topics into `num_sessions` sessions of `topics_per_session` each.
    ///
    /// A session never holds the same topic twice, so repeated entries in `topics` count
    /// once. When there are at least as many slots as distinct topics every topic is dealt
    /// at least once; the remaining slots are dealt from fresh shuffles of the topic list.
    pub fn random<R: Rng + ?Sized>(
        topics: &[String],
        num_sessions: usize,
        topics_per_session: usize,
        rng: &mut R,
    ) -> Result<Self, LayoutErr> {
        if topics.is_empty() || num_sessions == 0 || topics_per_session == 0 {
            return Err(LayoutErr::InvalidShape);
        }

        let mut seen = HashSet::new();
        let topics: Vec<&String> = topics.iter().filter(|topic| seen.insert(topic.as_str())).collect();
        let per_session = topics_per_session.min(topics.len());
        let mut deck: Vec<&String> = Vec::new();
        let mut sessions = Vec::with_capacity(num_sessions);

        for number in 1..=num_sessions {
            let mut session_topics: Vec<String> = Vec::with_capacity(per_session);
            while session_topics.len() < per_session {
                // Draw from the top of the deck, skipping topics this session already has
                match deck.iter().rposition(|t| !session_topics.iter().any(|s| s == *t)) {
                    Some(idx) => session_topics.push(deck.remove(idx).clone()),
                    None => {
                        // Leftover cards stay on top of the fresh shuffle
                        let mut fresh = topics.clone();
                        fresh.shuffle(rng);
                        fresh.append(&mut deck);
                        deck = fresh;
                    },
                }
            }

            sessions.push(SessionSlot {
                number: number as u32,
                topics: session_topics,
            });
        }

        trace!("random layout: {:?}", sessions);
        Ok(Self { sessions })
    }

    /// Checks the layout against the topic groups built from the CSV.
    ///
    /// Returns the topics the layout names that have no column in the CSV. The packer
    /// leaves those groups empty.
    pub fn validate(&self, groups: &TopicGroups) -> Result<Vec<String>, LayoutErr> {
        self.check_shape()?;

        let known: HashSet<&str> = groups.topics().collect();
        let unknown: Vec<String> = self.distinct_topics()
            .into_iter()
            .filter(|topic| !known.contains(topic.as_str()))
            .collect();

        for topic in &unknown {
            warn!("Topic '{}' is in the session layout but not in the interests file", topic);
        }

        Ok(unknown)
    }

    pub fn distinct_topics(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sessions
            .iter()
            .flat_map(|slot| slot.topics.iter())
            .filter(|topic| seen.insert(topic.as_str()))
            .cloned()
            .collect()
    }

    pub fn slot_count(&self) -> usize {
        self.sessions.iter().map(|slot| slot.topics.len()).sum()
    }

    fn check_shape(&self) -> Result<(), LayoutErr> {
        if self.sessions.is_empty() {
            return Err(LayoutErr::Empty);
        }

        let mut numbers = HashSet::new();
        for slot in &self.sessions {
            if !numbers.insert(slot.number) {
                return Err(LayoutErr::DuplicateSession(slot.number));
            }

            let mut topics = HashSet::new();
            if let Some(topic) = slot.topics.iter().find(|topic| !topics.insert(topic.as_str())) {
                return Err(LayoutErr::DuplicateTopic {
                    session: slot.number,
                    topic: topic.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    mod common {
        pub(crate) fn topics(names: &[&str]) -> Vec<String> {
            names.iter().map(|n| (*n).to_owned()).collect()
        }
    }

    mod unit_tests {
        use super::{common::*, *};
        use crate::groups::Selection;
        use crate::interests::InterestTable;

        #[test]
        fn test_predefined_layout() {
            let layout = SessionLayout::predefined();

            assert_eq!(layout.sessions.len(), 4);
            assert!(layout.sessions.iter().all(|slot| slot.topics.len() == 7));
            assert_eq!(layout.sessions[2].number, 3);
            assert_eq!(layout.sessions[2].topics[0], "FPGA Development");
            assert_eq!(layout.slot_count(), 28);
            assert_eq!(SessionLayout::predefined_topics().len(), 16);
        }

        #[test]
        fn test_numbered_json_layout() {
            let layout = SessionLayout::from_json_str(r#"{"2": ["Labs"], "1": ["AI", "Outreach"]}"#).unwrap();

            assert_eq!(layout.sessions, vec![
                SessionSlot { number: 1, topics: topics(&["AI", "Outreach"]) },
                SessionSlot { number: 2, topics: topics(&["Labs"]) },
            ]);
        }

        #[test]
        fn test_numbered_layout_sorts_numerically() {
            let layout = SessionLayout::from_json_str(r#"{"10": ["AI"], "2": ["Labs"]}"#).unwrap();

            assert_eq!(layout.sessions[0].number, 2);
            assert_eq!(layout.sessions[1].number, 10);
        }

        #[test]
        fn test_non_numeric_session_key() {
            let result = SessionLayout::from_json_str(r#"{"morning": ["AI"]}"#);

            assert!(matches!(result, Err(LayoutErr::BadSessionNumber(key)) if key == "morning"));
        }

        #[test]
        fn test_slot_list_json_layout() {
            let layout = SessionLayout::from_json_str(r#"[{"number": 7, "topics": ["AI"]}]"#).unwrap();

            assert_eq!(layout.sessions[0].number, 7);
        }

        #[test]
        fn test_duplicate_topic_in_session() {
            let result = SessionLayout::from_json_str(r#"{"1": ["AI", "AI"]}"#);

            assert!(matches!(result, Err(LayoutErr::DuplicateTopic { session: 1, .. })));
        }

        #[test]
        fn test_duplicate_session_number() {
            let result = SessionLayout::from_json_str(r#"[{"number": 1, "topics": ["AI"]}, {"number": 1, "topics": ["Labs"]}]"#);

            assert!(matches!(result, Err(LayoutErr::DuplicateSession(1))));
        }

        #[test]
        fn test_empty_layout() {
            assert!(matches!(SessionLayout::from_json_str("{}"), Err(LayoutErr::Empty)));
            assert!(matches!(SessionLayout::from_json_str("[1, 2]"), Err(LayoutErr::Json(_))));
        }

        #[test]
        fn test_missing_layout_file() {
            let result = SessionLayout::from_json_path("no/such/layout.json");

            assert!(matches!(result, Err(LayoutErr::NotFound(_))));
        }

        #[test]
        fn test_validate_reports_unknown_topics() {
            let table = InterestTable::from_reader("Name,AI,Labs\nAlice,4,5\n".as_bytes()).unwrap();
            let groups = TopicGroups::build(&table, Selection::Ranked);
            let layout = SessionLayout::from_json_str(r#"{"1": ["AI", "Knitting"], "2": ["Labs", "Knitting"]}"#).unwrap();

            assert_eq!(layout.validate(&groups).unwrap(), vec!["Knitting".to_owned()]);
        }

        #[test]
        fn test_random_layout_covers_every_topic() {
            let all = topics(&["A", "B", "C", "D", "E"]);
            let mut rng = StdRng::seed_from_u64(7);

            for _ in 0..50 {
                let layout = SessionLayout::random(&all, 3, 2, &mut rng).unwrap();

                assert_eq!(layout.sessions.len(), 3);
                assert_eq!(layout.slot_count(), 6);
                let mut covered = layout.distinct_topics();
                covered.sort();
                assert_eq!(covered, all);
                // no topic twice within a session
                assert!(layout.check_shape().is_ok());
            }
        }

        #[test]
        fn test_random_layout_caps_session_width() {
            let all = topics(&["A", "B"]);
            let mut rng = StdRng::seed_from_u64(1);
            let layout = SessionLayout::random(&all, 2, 5, &mut rng).unwrap();

            assert!(layout.sessions.iter().all(|slot| slot.topics.len() == 2));
        }

        #[test]
        fn test_random_layout_with_repeated_topics() {
            let all = topics(&["AI", "AI", "Labs"]);
            let mut rng = StdRng::seed_from_u64(3);
            let layout = SessionLayout::random(&all, 4, 7, &mut rng).unwrap();

            assert_eq!(layout.sessions.len(), 4);
            assert!(layout.sessions.iter().all(|slot| slot.topics.len() == 2));
            assert!(layout.check_shape().is_ok());
        }

        #[test]
        fn test_random_layout_is_seeded() {
            let all = topics(&["A", "B", "C", "D"]);
            let first = SessionLayout::random(&all, 2, 3, &mut StdRng::seed_from_u64(42)).unwrap();
            let second = SessionLayout::random(&all, 2, 3, &mut StdRng::seed_from_u64(42)).unwrap();

            assert_eq!(first, second);
        }

        #[test]
        fn test_random_layout_invalid_shape() {
            let mut rng = StdRng::seed_from_u64(1);

            assert!(matches!(SessionLayout::random(&[], 2, 2, &mut rng), Err(LayoutErr::InvalidShape)));
            assert!(matches!(SessionLayout::random(&topics(&["A"]), 0, 2, &mut rng), Err(LayoutErr::InvalidShape)));
        }
    }
}
