use itertools::{Itertools, MinMaxResult};
use num_format::{Locale, ToFormattedString};
use rayon::prelude::*;
use scheduler::utils::*;
use scheduler::*;

const NUM_PARTICIPANTS: usize = 120;
const NUM_TABLES: u64 = 8;
const SHUFFLE_RUNS: u64 = 32;
const SHUFFLE_ITERATIONS: usize = 200;

struct MethodResults {
    label: String,
    scores: Vec<Happiness>,
    satisfaction: Vec<f64>,
    best: Option<Plan>,
}

fn compare_methods() {
    let topics = SessionLayout::predefined_topics();
    let selections = [
        ("ranked", Selection::Ranked),
        ("top-n", Selection::TopN { n: groups::DEFAULT_TOP_N, min_rating: groups::DEFAULT_MIN_RATING }),
        ("threshold", Selection::Threshold { min_rating: groups::DEFAULT_MIN_RATING }),
        ("max-value", Selection::MaxValue),
    ];
    let policies = [
        ("hard cap", SizePolicy::default()),
        ("rebalance", SizePolicy::Rebalance {
            min_per_group: packing::DEFAULT_MIN_PER_GROUP,
            max_per_group: packing::DEFAULT_MAX_PER_GROUP,
        }),
    ];

    println!(
        "Evaluating {} tables of {} participants over {} topics\n",
        NUM_TABLES,
        NUM_PARTICIPANTS,
        topics.len(),
    );

    for ((selection_label, selection), (policy_label, policy)) in selections.iter().cartesian_product(policies.iter()) {
        // the predefined layout is deterministic, one run per table is enough
        let predefined = run_method(&format!("predefined / {selection_label} / {policy_label}"), &topics, *selection, *policy, 1, |_| {
            SchedulingMethod::Predefined(SessionLayout::predefined())
        });
        print_results(&predefined);

        let shuffled = run_method(&format!("shuffle / {selection_label} / {policy_label}"), &topics, *selection, *policy, SHUFFLE_RUNS, |seed| {
            SchedulingMethod::Shuffle(ShuffleOptions {
                iterations: SHUFFLE_ITERATIONS,
                seed: Some(seed),
                ..ShuffleOptions::default()
            })
        });
        print_results(&shuffled);
    }
}

fn run_method(
    label: &str,
    topics: &[String],
    selection: Selection,
    policy: SizePolicy,
    runs_per_table: u64,
    method_for: impl Fn(u64) -> SchedulingMethod + Sync,
) -> MethodResults {
    let runs: Vec<(Plan, f64)> = (0..NUM_TABLES)
        .cartesian_product(0..runs_per_table)
        .collect_vec()
        .par_iter()
        .filter_map(|&(table_seed, run_seed)| {
            let table = make_interest_table(NUM_PARTICIPANTS, topics, table_seed);
            let groups = TopicGroups::build(&table, selection);
            let interests = InterestIndex::from_table(&table, groups::DEFAULT_TOP_N, groups::DEFAULT_MIN_RATING);
            let ceiling = Happiness::ceiling(&table, &interests, ShuffleOptions::default().num_sessions);

            match plan(&table, &groups, &interests, &method_for(table_seed * runs_per_table + run_seed), policy) {
                Ok(plan) => {
                    let satisfaction = plan.happiness.satisfaction(&ceiling);
                    Some((plan, satisfaction))
                },
                Err(e) => {
                    eprintln!("{label}: table {table_seed} failed: {e}");
                    None
                },
            }
        })
        .collect();

    let scores = runs.iter().map(|(plan, _)| plan.happiness).collect();
    let satisfaction = runs.iter().map(|&(_, s)| s).collect();
    let best = runs.into_iter().max_by_key(|(plan, _)| plan.happiness).map(|(plan, _)| plan);

    MethodResults {
        label: label.to_owned(),
        scores,
        satisfaction,
        best,
    }
}

fn print_results(results: &MethodResults) {
    println!("=== {} ({} runs) ===", results.label, results.scores.len().to_formatted_string(&Locale::en));
    if results.scores.is_empty() {
        println!("No successful runs\n");
        return;
    }

    let runs = results.scores.len() as f64;
    let avg_seated = results.scores.iter().map(|h| h.seated).sum::<usize>() as f64 / runs;
    let avg_matched = results.scores.iter().map(|h| h.matched).sum::<usize>() as f64 / runs;
    let total_unseated: usize = results.scores.iter().map(|h| h.unseated).sum();
    let avg_satisfaction = results.satisfaction.iter().sum::<f64>() / runs;

    println!("Average seated: {:.2}", avg_seated);
    println!("Average matched seats: {:.2}", avg_matched);
    println!("Total unseated: {}", total_unseated.to_formatted_string(&Locale::en));
    println!("Average satisfaction: {:.1}%", avg_satisfaction * 100.0);
    match results.satisfaction.iter().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::MinMax(min, max) => println!("Satisfaction range: {:.1}% - {:.1}%", min * 100.0, max * 100.0),
        MinMaxResult::OneElement(only) => println!("Satisfaction: {:.1}%", only * 100.0),
        MinMaxResult::NoElements => {},
    }

    if let Some(best) = &results.best {
        println!("Best schedule ({:?}): \n{}", best.happiness, best.schedule);
    }
}

fn main() {
    compare_methods();
}
