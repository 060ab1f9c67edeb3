use crate::groups::TopicGroups;
use crate::interests::InterestTable;
use crate::layout::SessionLayout;
use crate::packing::{pack, Schedule, SizePolicy};
use crate::score::{Happiness, InterestIndex};
use crate::SchedulerErr;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, trace};

pub const DEFAULT_ITERATIONS: usize = 1000;
pub const DEFAULT_NUM_SESSIONS: usize = 4;
pub const DEFAULT_TOPICS_PER_SESSION: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShuffleOptions {
    pub iterations: usize,
    pub num_sessions: usize,
    pub topics_per_session: usize,
    pub seed: Option<u64>,
}

impl Default for ShuffleOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            num_sessions: DEFAULT_NUM_SESSIONS,
            topics_per_session: DEFAULT_TOPICS_PER_SESSION,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShuffleOutcome {
    pub schedule: Schedule,
    pub layout: SessionLayout,
    pub happiness: Happiness,
    pub iterations_run: usize,
}

/// Searches random session layouts for the happiest schedule.
///
/// Each iteration deals a fresh random layout, packs it under `policy` and scores it. The
/// first strictly better schedule wins, and the search stops early once a schedule
/// reaches the happiness ceiling. At least one iteration always runs.
pub fn shuffle_search(
    table: &InterestTable,
    groups: &TopicGroups,
    interests: &InterestIndex,
    options: ShuffleOptions,
    policy: SizePolicy,
) -> Result<ShuffleOutcome, SchedulerErr> {
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let ceiling = Happiness::ceiling(table, interests, options.num_sessions);
    let iterations = options.iterations.max(1);
    let mut best: Option<ShuffleOutcome> = None;

    for iteration in 1..=iterations {
        let layout = SessionLayout::random(&table.topics, options.num_sessions, options.topics_per_session, &mut rng)?;
        let schedule = pack(table, groups, &layout, policy)?;
        let happiness = Happiness::score(&schedule, interests);
        trace!("iteration {}: {:?}", iteration, happiness);

        if best.as_ref().is_none_or(|b| happiness > b.happiness) {
            debug!("iteration {} improved happiness to {:?}", iteration, happiness);
            best = Some(ShuffleOutcome {
                schedule,
                layout,
                happiness,
                iterations_run: iteration,
            });
        }

        if let Some(best) = best.as_mut() {
            best.iterations_run = iteration;
            if best.happiness >= ceiling {
                info!("Reached the happiness ceiling after {} iterations", iteration);
                break;
            }
        }
    }

    let outcome = best.ok_or(SchedulerErr::NoIterations)?;
    info!(
        "Best shuffled schedule seats {} participants with {} matched seats after {} iterations",
        outcome.happiness.seated,
        outcome.happiness.matched,
        outcome.iterations_run,
    );
    Ok(outcome)
}
