use crate::groups::TopicGroups;
use crate::interests::InterestTable;
use crate::layout::SessionLayout;
use crate::packing::{pack, Schedule, SizePolicy};
use crate::score::{Happiness, InterestIndex};
use crate::shuffle::{shuffle_search, ShuffleOptions};
use crate::SchedulerErr;
use std::time::Instant;
use tracing::{info, trace};

/// Where the topic-to-session map comes from
///
/// # Variants
/// - `Predefined` - a fixed layout, packed once
/// - `Shuffle` - random layouts, the happiest of many packings wins
#[derive(Debug, Clone)]
pub enum SchedulingMethod {
    Predefined(SessionLayout),
    Shuffle(ShuffleOptions),
}

impl Default for SchedulingMethod {
    fn default() -> Self {
        SchedulingMethod::Predefined(SessionLayout::predefined())
    }
}

/// A finished schedule together with the layout it was packed into
#[derive(Debug, Clone)]
pub struct Plan {
    pub schedule: Schedule,
    pub layout: SessionLayout,
    pub happiness: Happiness,
    /// Layouts tried, one for a predefined layout
    pub iterations_run: usize,
}

/// Runs the chosen scheduling method end to end.
///
/// # Errors
/// - the layout is malformed or cannot be generated
/// - the size policy bounds are invalid
/// - the finished schedule books someone twice in one session
pub fn plan(
    table: &InterestTable,
    groups: &TopicGroups,
    interests: &InterestIndex,
    method: &SchedulingMethod,
    policy: SizePolicy,
) -> Result<Plan, SchedulerErr> {
    let start = Instant::now();

    let plan = match method {
        SchedulingMethod::Predefined(layout) => {
            info!("Using predefined scheduling method");
            layout.validate(groups)?;
            let schedule = pack(table, groups, layout, policy)?;
            let happiness = Happiness::score(&schedule, interests);

            Plan {
                schedule,
                layout: layout.clone(),
                happiness,
                iterations_run: 1,
            }
        },
        SchedulingMethod::Shuffle(options) => {
            info!("Using shuffle scheduling method");
            let outcome = shuffle_search(table, groups, interests, *options, policy)?;

            Plan {
                schedule: outcome.schedule,
                layout: outcome.layout,
                happiness: outcome.happiness,
                iterations_run: outcome.iterations_run,
            }
        },
    };

    plan.schedule.validate_no_double_booking()?;
    trace!("schedule:\n{}", plan.schedule);
    trace!("duration: {:?}", start.elapsed());

    Ok(plan)
}
