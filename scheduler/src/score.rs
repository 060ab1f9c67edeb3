use crate::interests::InterestTable;
use crate::packing::Schedule;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Each participant's favourite topics, used to judge how happy a schedule makes them
#[derive(Debug, Clone, Default)]
pub struct InterestIndex {
    by_name: HashMap<String, HashSet<String>>,
}

impl InterestIndex {
    pub fn from_table(table: &InterestTable, top_n: usize, min_rating: u8) -> Self {
        Self {
            by_name: table
                .top_interests(top_n, min_rating)
                .into_iter()
                .map(|top| (top.name, top.topics.into_iter().collect()))
                .collect(),
        }
    }

    pub fn is_interested(&self, name: &str, topic: &str) -> bool {
        self.by_name.get(name).is_some_and(|topics| topics.contains(topic))
    }

    pub fn interest_count(&self, name: &str) -> usize {
        self.by_name.get(name).map_or(0, HashSet::len)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// How well a schedule serves the participants
///
/// # Fields
/// - `seated` - distinct participants with at least one seat
/// - `matched` - per participant, the distinct topics of interest they are seated in,
///   counting at most one per session
/// - `unseated` - participants with no seat at all
///
/// Happiness orders by `seated`, then `matched`, then fewer `unseated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Happiness {
    pub seated: usize,
    pub matched: usize,
    pub unseated: usize,
}

impl Ord for Happiness {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seated
            .cmp(&other.seated)
            .then(self.matched.cmp(&other.matched))
            .then(other.unseated.cmp(&self.unseated))
    }
}

impl PartialOrd for Happiness {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Happiness {
    /// Scores a schedule by counting seats against each participant's interests.
    ///
    /// Sitting in a favourite topic twice counts once, and a merged group covering two
    /// favourites still fills only one session, so `matched` never exceeds
    /// [`Happiness::ceiling`].
    pub fn score(schedule: &Schedule, interests: &InterestIndex) -> Self {
        let seated = schedule.seated_names().len();

        // name -> (favourite topics sat in, sessions with a favourite seat)
        let mut per_person: HashMap<&str, (HashSet<&str>, usize)> = HashMap::new();
        for group in schedule.sessions.iter().flat_map(|session| session.groups.iter()) {
            for member in &group.members {
                let liked: Vec<&str> = group.covers
                    .iter()
                    .filter(|topic| interests.is_interested(member, topic))
                    .map(String::as_str)
                    .collect();
                if liked.is_empty() {
                    continue;
                }

                let (topics, sessions) = per_person.entry(member.as_str()).or_default();
                topics.extend(liked);
                *sessions += 1;
            }
        }

        let matched = per_person
            .values()
            .map(|(topics, sessions)| topics.len().min(*sessions))
            .sum();

        Self {
            seated,
            matched,
            unseated: schedule.unseated.len(),
        }
    }

    /// The best score any schedule with `num_sessions` sessions could reach.
    ///
    /// Everyone seated, and everyone matched once per session up to their number of
    /// interests.
    pub fn ceiling(table: &InterestTable, interests: &InterestIndex, num_sessions: usize) -> Self {
        Self {
            seated: table.len(),
            matched: table
                .names()
                .map(|name| interests.interest_count(name).min(num_sessions))
                .sum(),
            unseated: 0,
        }
    }

    /// Fraction of the ceiling's matched seats this score reaches.
    pub fn satisfaction(&self, ceiling: &Happiness) -> f64 {
        if ceiling.matched == 0 {
            return 1.0;
        }
        self.matched as f64 / ceiling.matched as f64
    }
}
