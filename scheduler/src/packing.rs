use crate::groups::TopicGroups;
use crate::interests::InterestTable;
use crate::layout::SessionLayout;
use crate::rebalance::{rebalance, RebalanceErr};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use tracing::{debug, info, trace, warn};

/// Default hard cap on the size of a topic group
pub const DEFAULT_MAX_PER_GROUP: usize = 12;
/// Default lower bound used when rebalancing groups
pub const DEFAULT_MIN_PER_GROUP: usize = 3;

/// How group sizes are kept in check
///
/// # Variants
/// - `HardCap` - groups stop accepting people once they reach `max_per_group`
/// - `Rebalance` - groups are packed without a cap, then split above `max_per_group`
///   and merged below `min_per_group`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePolicy {
    HardCap { max_per_group: usize },
    Rebalance { min_per_group: usize, max_per_group: usize },
}

impl Default for SizePolicy {
    fn default() -> Self {
        SizePolicy::HardCap { max_per_group: DEFAULT_MAX_PER_GROUP }
    }
}

impl SizePolicy {
    /// The cap applied while packing, if any.
    pub fn packing_cap(&self) -> Option<usize> {
        match *self {
            SizePolicy::HardCap { max_per_group } => Some(max_per_group),
            SizePolicy::Rebalance { .. } => None,
        }
    }
}

/// The people seated in one topic during one session
///
/// `covers` lists the CSV topics the group stands for. It is just `[topic]` until
/// rebalancing splits or merges groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignedGroup {
    pub topic: String,
    pub covers: Vec<String>,
    pub members: Vec<String>,
}

impl AssignedGroup {
    pub fn new(topic: impl Into<String>) -> Self {
        let topic = topic.into();
        Self {
            covers: vec![topic.clone()],
            topic,
            members: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledSession {
    pub number: u32,
    pub groups: Vec<AssignedGroup>,
}

impl ScheduledSession {
    pub fn is_booked(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g.members.iter().any(|m| m == name))
    }
}

/// The finished assignment of participants to session groups
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Schedule {
    pub sessions: Vec<ScheduledSession>,
    /// Participants that could not be seated in any session
    pub unseated: Vec<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{name} is booked more than once in session {session}")]
pub struct DoubleBooking {
    pub session: u32,
    pub name: String,
}

impl Schedule {
    pub fn session(&self, number: u32) -> Option<&ScheduledSession> {
        self.sessions.iter().find(|s| s.number == number)
    }

    pub fn is_booked(&self, session: u32, name: &str) -> bool {
        self.session(session).is_some_and(|s| s.is_booked(name))
    }

    /// Names seated at least once anywhere in the schedule
    pub fn seated_names(&self) -> HashSet<&str> {
        self.sessions
            .iter()
            .flat_map(|s| s.groups.iter())
            .flat_map(|g| g.members.iter().map(String::as_str))
            .collect()
    }

    /// `(session, topic, size)` for every group, in print order
    pub fn group_sizes(&self) -> Vec<(u32, &str, usize)> {
        self.sessions
            .iter()
            .flat_map(|s| s.groups.iter().map(move |g| (s.number, g.topic.as_str(), g.len())))
            .collect()
    }

    pub fn validate_no_double_booking(&self) -> Result<(), DoubleBooking> {
        for session in &self.sessions {
            let mut seen = HashSet::new();
            for name in session.groups.iter().flat_map(|g| g.members.iter()) {
                if !seen.insert(name.as_str()) {
                    return Err(DoubleBooking {
                        session: session.number,
                        name: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for session in &self.sessions {
            let groups = session.groups
                .iter()
                .map(|g| format!("{} ({})", g.topic, g.len()))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "Session {}: {}", session.number, groups)?;
        }
        if !self.unseated.is_empty() {
            writeln!(f, "Unseated: {}", self.unseated.join(", "))?;
        }
        Ok(())
    }
}

/// Greedily packs topic groups into the sessions of `layout`.
///
/// Sessions and their topics are visited in layout order, and each topic takes its
/// candidates best rating first. A candidate is skipped when they already sit in another
/// topic of the same session or when the group has reached `cap`.
///
/// Afterwards everyone still unseated gets one seat in the open group they rated highest,
/// interested or not, as long as it is below `cap`. Ties go to the earlier group in
/// layout order. Anyone left over ends up in `Schedule::unseated`.
pub fn assign_sessions(
    table: &InterestTable,
    groups: &TopicGroups,
    layout: &SessionLayout,
    cap: Option<usize>,
) -> Schedule {
    let has_room = |group: &AssignedGroup| cap.is_none_or(|cap| group.len() < cap);

    let mut sessions: Vec<ScheduledSession> = Vec::with_capacity(layout.sessions.len());
    let mut booked: Vec<HashSet<String>> = vec![HashSet::new(); layout.sessions.len()];

    for (session_idx, slot) in layout.sessions.iter().enumerate() {
        let mut session = ScheduledSession {
            number: slot.number,
            groups: Vec::with_capacity(slot.topics.len()),
        };

        for topic in &slot.topics {
            let mut assigned = AssignedGroup::new(topic.clone());
            if let Some(group) = groups.get(topic) {
                for candidate in &group.candidates {
                    if !has_room(&assigned) {
                        break;
                    }
                    if booked[session_idx].insert(candidate.name.clone()) {
                        assigned.members.push(candidate.name.clone());
                    }
                }
            } else {
                trace!("no topic group for '{}', leaving it empty", topic);
            }
            session.groups.push(assigned);
        }

        sessions.push(session);
    }

    let seated: HashSet<String> = booked.iter().flatten().cloned().collect();
    let mut unseated = Vec::new();

    for participant in &table.participants {
        if seated.contains(&participant.name) {
            continue;
        }

        let mut best: Option<(usize, usize, Option<u8>)> = None;
        for (session_idx, session) in sessions.iter().enumerate() {
            if booked[session_idx].contains(&participant.name) {
                continue;
            }
            for (group_idx, group) in session.groups.iter().enumerate() {
                if groups.get(&group.topic).is_none() || !has_room(group) {
                    continue;
                }
                let rating = table.topic_index(&group.topic).and_then(|idx| participant.rating(idx));
                // Option orders None below every rating
                if best.is_none_or(|(_, _, best_rating)| rating > best_rating) {
                    best = Some((session_idx, group_idx, rating));
                }
            }
        }

        match best {
            Some((session_idx, group_idx, _)) => {
                debug!(
                    "seating {} in '{}' during session {} so they attend something",
                    participant.name,
                    sessions[session_idx].groups[group_idx].topic,
                    sessions[session_idx].number,
                );
                sessions[session_idx].groups[group_idx].members.push(participant.name.clone());
                booked[session_idx].insert(participant.name.clone());
            },
            None => {
                warn!("{} could not be seated in any session", participant.name);
                unseated.push(participant.name.clone());
            },
        }
    }

    Schedule { sessions, unseated }
}

/// Packs the layout and applies the size policy.
pub fn pack(
    table: &InterestTable,
    groups: &TopicGroups,
    layout: &SessionLayout,
    policy: SizePolicy,
) -> Result<Schedule, RebalanceErr> {
    let mut schedule = assign_sessions(table, groups, layout, policy.packing_cap());

    if let SizePolicy::Rebalance { min_per_group, max_per_group } = policy {
        rebalance(&mut schedule, min_per_group, max_per_group)?;
    }

    info!(
        "Packed {} of {} participants into {} sessions",
        schedule.seated_names().len(),
        table.len(),
        schedule.sessions.len(),
    );
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::Selection;
    use crate::layout::SessionSlot;

    mod common {
        use super::*;

        pub(crate) fn table_from(csv: &str) -> InterestTable {
            InterestTable::from_reader(csv.as_bytes()).unwrap()
        }

        pub(crate) fn layout_from(sessions: &[&[&str]]) -> SessionLayout {
            SessionLayout::new(sessions
                .iter()
                .zip(1..)
                .map(|(topics, number)| SessionSlot {
                    number,
                    topics: topics.iter().map(|t| (*t).to_owned()).collect(),
                })
                .collect())
                .unwrap()
        }

        pub(crate) fn members<'a>(schedule: &'a Schedule, session: u32, topic: &str) -> Vec<&'a str> {
            schedule
                .session(session)
                .and_then(|s| s.groups.iter().find(|g| g.topic == topic))
                .map(|g| g.members.iter().map(String::as_str).collect())
                .unwrap_or_default()
        }

        /// Twelve participants who all love AI and rate Labs lower
        pub(crate) fn crowded_csv() -> String {
            let mut csv = String::from("Name,AI,Labs\n");
            for i in 0..12 {
                csv.push_str(&format!("P{i:02},{},{}\n", 6 - (i % 3), 1 + (i % 5)));
            }
            csv
        }
    }

    mod unit_tests {
        use super::{common::*, *};

        #[test]
        fn test_no_double_booking_within_a_session() {
            let table = table_from("Name,AI,Labs\nAlice,6,5\nBob,5,6\n");
            let groups = TopicGroups::build(&table, Selection::Ranked);
            let layout = layout_from(&[&["AI", "Labs"]]);

            let schedule = assign_sessions(&table, &groups, &layout, None);

            // everyone is ranked for AI, which comes first in the session
            assert_eq!(members(&schedule, 1, "AI"), vec!["Alice", "Bob"]);
            assert!(members(&schedule, 1, "Labs").is_empty());
            assert!(schedule.validate_no_double_booking().is_ok());
        }

        #[test]
        fn test_hard_cap_limits_group_size() {
            let table = table_from("Name,AI,Labs\nAlice,6,5\nBob,5,6\nCarol,4,4\n");
            let groups = TopicGroups::build(&table, Selection::Ranked);
            let layout = layout_from(&[&["AI", "Labs"]]);

            let schedule = assign_sessions(&table, &groups, &layout, Some(2));

            assert_eq!(members(&schedule, 1, "AI"), vec!["Alice", "Bob"]);
            assert_eq!(members(&schedule, 1, "Labs"), vec!["Carol"]);
        }

        #[test]
        fn test_same_person_in_different_sessions() {
            let table = table_from("Name,AI\nAlice,6\n");
            let groups = TopicGroups::build(&table, Selection::Ranked);
            let layout = layout_from(&[&["AI"], &["AI"]]);

            let schedule = assign_sessions(&table, &groups, &layout, Some(12));

            assert!(schedule.is_booked(1, "Alice"));
            assert!(schedule.is_booked(2, "Alice"));
        }

        #[test]
        fn test_uninterested_participant_gets_best_open_seat() {
            // Carol rates nothing above 3, so top-n selection leaves her out of every group
            let table = table_from("Name,AI,Labs\nAlice,6,1\nBob,1,6\nCarol,2,3\n");
            let groups = TopicGroups::build(&table, Selection::TopN { n: 4, min_rating: 3 });
            let layout = layout_from(&[&["AI", "Labs"]]);

            let schedule = assign_sessions(&table, &groups, &layout, Some(12));

            assert_eq!(members(&schedule, 1, "Labs"), vec!["Bob", "Carol"]);
            assert!(schedule.unseated.is_empty());
        }

        #[test]
        fn test_seat_everyone_respects_cap() {
            let table = table_from("Name,AI\nAlice,6\nBob,5\nCarol,2\n");
            let groups = TopicGroups::build(&table, Selection::Threshold { min_rating: 3 });
            let layout = layout_from(&[&["AI"]]);

            let schedule = assign_sessions(&table, &groups, &layout, Some(2));

            assert_eq!(members(&schedule, 1, "AI"), vec!["Alice", "Bob"]);
            assert_eq!(schedule.unseated, vec!["Carol".to_owned()]);
        }

        #[test]
        fn test_seat_everyone_prefers_earlier_group_on_ties() {
            let table = table_from("Name,AI,Labs,Outreach\nAlice,6,1,1\nBob,2,2,2\n");
            let groups = TopicGroups::build(&table, Selection::Threshold { min_rating: 3 });
            let layout = layout_from(&[&["AI"], &["Labs", "Outreach"]]);

            let schedule = assign_sessions(&table, &groups, &layout, Some(12));

            assert_eq!(members(&schedule, 1, "AI"), vec!["Alice", "Bob"]);
            assert!(!schedule.is_booked(2, "Bob"));
        }

        #[test]
        fn test_unknown_topic_is_left_empty() {
            let table = table_from("Name,AI\nAlice,6\n");
            let groups = TopicGroups::build(&table, Selection::Ranked);
            let layout = layout_from(&[&["Knitting", "AI"]]);

            let schedule = assign_sessions(&table, &groups, &layout, Some(12));

            assert!(members(&schedule, 1, "Knitting").is_empty());
            assert_eq!(members(&schedule, 1, "AI"), vec!["Alice"]);
        }

        #[test]
        fn test_empty_table() {
            let table = table_from("Name,AI,Labs\n");
            let groups = TopicGroups::build(&table, Selection::Ranked);

            let schedule = assign_sessions(&table, &groups, &SessionLayout::predefined(), Some(12));

            assert_eq!(schedule.sessions.len(), 4);
            assert!(schedule.seated_names().is_empty());
            assert!(schedule.unseated.is_empty());
        }

        #[test]
        fn test_validate_no_double_booking_detects_conflict() {
            let mut ai = AssignedGroup::new("AI");
            ai.members.push("Alice".into());
            let mut labs = AssignedGroup::new("Labs");
            labs.members.push("Alice".into());
            let schedule = Schedule {
                sessions: vec![ScheduledSession { number: 3, groups: vec![ai, labs] }],
                unseated: vec![],
            };

            assert_eq!(schedule.validate_no_double_booking(), Err(DoubleBooking { session: 3, name: "Alice".into() }));
        }

        #[test]
        fn test_group_sizes_and_display() {
            let table = table_from("Name,AI,Labs\nAlice,6,5\nBob,5,6\n");
            let groups = TopicGroups::build(&table, Selection::MaxValue);
            let layout = layout_from(&[&["AI", "Labs"]]);

            let schedule = assign_sessions(&table, &groups, &layout, Some(12));

            assert_eq!(schedule.group_sizes(), vec![(1, "AI", 1), (1, "Labs", 1)]);
            assert_eq!(schedule.to_string(), "Session 1: AI (1), Labs (1)\n");
        }
    }

    mod scheduler_quality_tests {
        use super::{common::*, *};

        #[test]
        fn test_predefined_layout_with_crowded_topic() {
            let table = table_from(&crowded_csv());
            let groups = TopicGroups::build(&table, Selection::Ranked);
            let layout = layout_from(&[&["AI", "Labs"], &["AI"]]);

            let schedule = pack(&table, &groups, &layout, SizePolicy::HardCap { max_per_group: 5 }).unwrap();

            assert_eq!(members(&schedule, 1, "AI").len(), 5);
            assert_eq!(members(&schedule, 1, "Labs").len(), 5);
            assert_eq!(members(&schedule, 2, "AI").len(), 5);
            assert!(schedule.validate_no_double_booking().is_ok());
            // session 2 takes the same five AI fans, so two people find no open seat
            assert_eq!(schedule.seated_names().len(), 10);
            assert_eq!(schedule.unseated.len(), 2);
            assert_eq!(schedule.seated_names().len() + schedule.unseated.len(), table.len());
        }

        #[test]
        fn test_rebalance_policy_packs_without_cap() {
            let table = table_from(&crowded_csv());
            let groups = TopicGroups::build(&table, Selection::Ranked);
            let layout = layout_from(&[&["AI", "Labs"]]);

            let policy = SizePolicy::Rebalance { min_per_group: 2, max_per_group: 5 };
            let schedule = pack(&table, &groups, &layout, policy).unwrap();

            // twelve AI people split into three sections, the empty Labs group is dropped
            assert_eq!(schedule.sessions[0].groups.len(), 3);
            assert!(schedule.sessions[0].groups.iter().all(|g| g.len() == 4));
            assert!(schedule.unseated.is_empty());
            assert!(schedule.validate_no_double_booking().is_ok());
        }

        #[test]
        fn test_every_participant_accounted_for_in_predefined_layout() {
            let table = crate::utils::make_interest_table(60, &SessionLayout::predefined_topics(), 3);
            let groups = TopicGroups::build(&table, Selection::Ranked);

            let schedule = pack(&table, &groups, &SessionLayout::predefined(), SizePolicy::default()).unwrap();

            assert!(schedule.validate_no_double_booking().is_ok());
            assert_eq!(schedule.seated_names().len() + schedule.unseated.len(), 60);
            assert!(schedule.group_sizes().iter().all(|&(_, _, size)| size <= DEFAULT_MAX_PER_GROUP));
        }
    }
}
