use crate::packing::{AssignedGroup, Schedule};
use itertools::Itertools;
use tracing::debug;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RebalanceErr {
    #[error("Minimum group size {min} is larger than the maximum {max}")]
    InvalidBounds { min: usize, max: usize },
    #[error("Maximum group size must be at least 1")]
    ZeroMax,
}

/// Splits oversized groups and merges undersized ones, session by session.
///
/// People only ever move between groups of the same session, so a schedule without
/// double bookings stays that way. Groups left empty are dropped.
pub fn rebalance(schedule: &mut Schedule, min: usize, max: usize) -> Result<(), RebalanceErr> {
    if max == 0 {
        return Err(RebalanceErr::ZeroMax);
    }
    if min > max {
        return Err(RebalanceErr::InvalidBounds { min, max });
    }

    for session in &mut schedule.sessions {
        let groups = std::mem::take(&mut session.groups);
        let groups = split_oversized(groups, max);
        let mut groups = merge_undersized(groups, min, max);
        groups.retain(|g| !g.is_empty());

        debug!("session {} rebalanced into {} groups", session.number, groups.len());
        session.groups = groups;
    }

    Ok(())
}

/// Turns every group above `max` into parallel sections of near-equal size.
///
/// Members are dealt round robin in their ranked order, so every section gets some of
/// the keenest people.
fn split_oversized(groups: Vec<AssignedGroup>, max: usize) -> Vec<AssignedGroup> {
    groups
        .into_iter()
        .flat_map(|group| {
            if group.len() <= max {
                return vec![group];
            }

            let sections = group.len().div_ceil(max);
            let mut split: Vec<AssignedGroup> = (1..=sections)
                .map(|k| AssignedGroup {
                    topic: format!("{} ({}/{})", group.topic, k, sections),
                    covers: group.covers.clone(),
                    members: Vec::with_capacity(max),
                })
                .collect();

            for (i, member) in group.members.into_iter().enumerate() {
                split[i % sections].members.push(member);
            }

            debug!("split '{}' into {} sections", group.topic, sections);
            split
        })
        .collect()
}

/// Merges undersized groups of one session, smallest first.
///
/// A pair is merged only when the result stays within `max`. Groups that cannot be
/// merged stay undersized, the lower bound is soft.
fn merge_undersized(mut groups: Vec<AssignedGroup>, min: usize, max: usize) -> Vec<AssignedGroup> {
    loop {
        let undersized: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, g)| !g.is_empty() && g.len() < min)
            .sorted_by_key(|(_, g)| g.len())
            .map(|(idx, _)| idx)
            .collect();

        let pair = undersized
            .iter()
            .tuple_combinations()
            .find(|&(&small, &other)| groups[small].len() + groups[other].len() <= max);

        let Some((&small, &other)) = pair else {
            break;
        };

        let absorbed = groups.remove(small);
        // removing `small` shifts everything after it down by one
        let target = if other > small { other - 1 } else { other };
        let merged = &mut groups[target];

        debug!("merging '{}' into '{}'", absorbed.topic, merged.topic);
        merged.topic = format!("{} + {}", merged.topic, absorbed.topic);
        merged.covers.extend(absorbed.covers);
        merged.members.extend(absorbed.members);
    }

    groups
}
