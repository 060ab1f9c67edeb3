//! Greedy assignment of participants to parallel session groups.
//!
//! The pipeline reads an [`InterestTable`], buckets participants into [`TopicGroups`],
//! packs those groups into the sessions of a [`SessionLayout`] and scores the resulting
//! [`Schedule`]. A participant is never booked into two topics of the same session.

pub mod groups;
pub mod interests;
pub mod layout;
pub mod packing;
pub mod rebalance;
pub mod score;
pub mod shuffle;
pub mod strategy;
pub mod utils;

pub use groups::{Candidate, Selection, TopicGroup, TopicGroups};
pub use interests::{InterestTable, InterestsErr, Participant, TopInterests, Volunteer};
pub use layout::{LayoutErr, SessionLayout, SessionSlot};
pub use packing::{assign_sessions, pack, AssignedGroup, DoubleBooking, Schedule, ScheduledSession, SizePolicy};
pub use rebalance::{rebalance, RebalanceErr};
pub use score::{Happiness, InterestIndex};
pub use shuffle::{shuffle_search, ShuffleOptions, ShuffleOutcome};
pub use strategy::{plan, Plan, SchedulingMethod};

/// Errors surfaced by the scheduling pipeline
#[derive(Debug, thiserror::Error)]
pub enum SchedulerErr {
    #[error(transparent)]
    Interests(#[from] InterestsErr),
    #[error(transparent)]
    Layout(#[from] LayoutErr),
    #[error(transparent)]
    Rebalance(#[from] RebalanceErr),
    #[error("Schedule is invalid: {0}")]
    DoubleBooked(#[from] DoubleBooking),
    #[error("The shuffle search produced no schedule")]
    NoIterations,
}
