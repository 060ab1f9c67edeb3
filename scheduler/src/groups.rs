use crate::interests::{InterestTable, Participant};
use tracing::debug;

/// Default number of favourite topics considered per participant
pub const DEFAULT_TOP_N: usize = 4;
/// Ratings must be strictly above this to count as an interest
pub const DEFAULT_MIN_RATING: u8 = 3;

/// How participants qualify for a topic group
///
/// # Variants
/// - `Ranked` - everyone joins every group, best ratings first and blank ratings last
/// - `TopN` - the topic is one of the participant's `n` favourites rated above `min_rating`
/// - `Threshold` - the rating is strictly above `min_rating`
/// - `MaxValue` - the rating equals the participant's own highest rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Ranked,
    TopN { n: usize, min_rating: u8 },
    Threshold { min_rating: u8 },
    MaxValue,
}

impl Selection {
    /// Topic indices the participant qualifies for under this selection rule.
    fn qualifying_topics(&self, participant: &Participant) -> Vec<usize> {
        let rated = participant.ratings
            .iter()
            .enumerate()
            .filter_map(|(idx, rating)| rating.map(|r| (idx, r)));

        match *self {
            Selection::Ranked => (0..participant.ratings.len()).collect(),
            Selection::TopN { n, min_rating } => participant.top_interests(n, min_rating),
            Selection::Threshold { min_rating } => rated
                .filter(|&(_, rating)| rating > min_rating)
                .map(|(idx, _)| idx)
                .collect(),
            Selection::MaxValue => match participant.max_rating() {
                Some(max) => rated
                    .filter(|&(_, rating)| rating == max)
                    .map(|(idx, _)| idx)
                    .collect(),
                None => vec![],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    /// `None` for a blank cell, only possible under `Selection::Ranked`
    pub rating: Option<u8>,
}

/// The participants interested in one topic, best rating first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicGroup {
    pub topic: String,
    pub candidates: Vec<Candidate>,
}

impl TopicGroup {
    pub fn contains(&self, name: &str) -> bool {
        self.candidates.iter().any(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// One `TopicGroup` per topic column, in column order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopicGroups {
    groups: Vec<TopicGroup>,
}

impl TopicGroups {
    pub fn build(table: &InterestTable, selection: Selection) -> Self {
        let mut groups: Vec<TopicGroup> = table.topics
            .iter()
            .map(|topic| TopicGroup {
                topic: topic.clone(),
                candidates: Vec::new(),
            })
            .collect();

        for participant in &table.participants {
            for topic_idx in selection.qualifying_topics(participant) {
                groups[topic_idx].candidates.push(Candidate {
                    name: participant.name.clone(),
                    rating: participant.rating(topic_idx),
                });
            }
        }

        // Stable sort so equal ratings keep the CSV row order; None sorts below every rating
        for group in &mut groups {
            group.candidates.sort_by(|a, b| b.rating.cmp(&a.rating));
            debug!("topic '{}' has {} interested participants", group.topic, group.len());
        }

        Self { groups }
    }

    pub fn get(&self, topic: &str) -> Option<&TopicGroup> {
        self.groups.iter().find(|g| g.topic == topic)
    }

    pub fn interested(&self, name: &str, topic: &str) -> bool {
        self.get(topic).is_some_and(|g| g.contains(name))
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.topic.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopicGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
