//! Synthetic interest tables for tests, benchmarks and demos.

use crate::interests::{InterestTable, Participant, LOWEST_RATING, VOLUNTEER_RATING};
use fake::faker::name::raw::{FirstName, LastName};
use fake::locales::EN;
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Share of cells left blank, as if the participant skipped the question
const BLANK_CELL_CHANCE: f64 = 0.1;

/// Builds a reproducible table of `num_participants` people rating every topic.
///
/// Names come from `fake` and are made unique with a numeric suffix. The same `seed`
/// always gives the same table.
pub fn make_interest_table(num_participants: usize, topics: &[String], seed: u64) -> InterestTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut names = HashSet::with_capacity(num_participants);
    let mut participants = Vec::with_capacity(num_participants);

    while participants.len() < num_participants {
        let first: String = FirstName(EN).fake_with_rng(&mut rng);
        let last: String = LastName(EN).fake_with_rng(&mut rng);
        let mut name = format!("{first} {last}");
        let mut suffix = 2;
        while names.contains(&name) {
            name = format!("{first} {last} {suffix}");
            suffix += 1;
        }
        names.insert(name.clone());

        let ratings = topics
            .iter()
            .map(|_| {
                if rng.random_bool(BLANK_CELL_CHANCE) {
                    None
                } else {
                    Some(rng.random_range(LOWEST_RATING..=VOLUNTEER_RATING))
                }
            })
            .collect();

        participants.push(Participant::new(name, ratings));
    }

    InterestTable {
        topics: topics.to_vec(),
        participants,
    }
}
