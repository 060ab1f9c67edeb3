use crate::Cli;
use clap::ValueEnum;
use scheduler::groups::{DEFAULT_MIN_RATING, DEFAULT_TOP_N};
use scheduler::packing::{DEFAULT_MAX_PER_GROUP, DEFAULT_MIN_PER_GROUP};
use scheduler::shuffle::{DEFAULT_ITERATIONS, DEFAULT_NUM_SESSIONS, DEFAULT_TOPICS_PER_SESSION};
use scheduler::{LayoutErr, SchedulingMethod, Selection, SessionLayout, ShuffleOptions, SizePolicy};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_INTERESTS_CSV: &str = "interests.csv";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigErr {
    #[error("{var} must be a non-negative whole number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

/// How topics are mapped onto sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Method {
    #[default]
    Predefined,
    Shuffle,
}

/// How group sizes are kept in check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Sizing {
    #[default]
    Cap,
    Rebalance,
}

/// Who joins a topic group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SelectionKind {
    #[default]
    Ranked,
    TopN,
    Threshold,
    Max,
}

/// Settings for one run, read from the environment and overridden by the command line
///
/// # Fields
/// - `interests_csv`: Path of the interests table
/// - `layout`: Optional JSON layout replacing the built-in one
/// - `max_per_group` / `min_per_group`: Group size bounds
/// - `top_n` / `min_rating`: What counts as a participant's interest
/// - `iterations`, `num_sessions`, `topics_per_session`, `seed`: Shuffle search settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub interests_csv: PathBuf,
    pub method: Method,
    pub sizing: Sizing,
    pub selection: SelectionKind,
    pub layout: Option<PathBuf>,
    pub max_per_group: usize,
    pub min_per_group: usize,
    pub top_n: usize,
    pub min_rating: u8,
    pub iterations: usize,
    pub num_sessions: usize,
    pub topics_per_session: usize,
    pub seed: Option<u64>,
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interests_csv: PathBuf::from(DEFAULT_INTERESTS_CSV),
            method: Method::default(),
            sizing: Sizing::default(),
            selection: SelectionKind::default(),
            layout: None,
            max_per_group: DEFAULT_MAX_PER_GROUP,
            min_per_group: DEFAULT_MIN_PER_GROUP,
            top_n: DEFAULT_TOP_N,
            min_rating: DEFAULT_MIN_RATING,
            iterations: DEFAULT_ITERATIONS,
            num_sessions: DEFAULT_NUM_SESSIONS,
            topics_per_session: DEFAULT_TOPICS_PER_SESSION,
            seed: None,
            json: false,
        }
    }
}

impl Config {
    /// Reads the configuration from environment variables.
    ///
    /// # Errors
    /// Returns `ConfigErr::InvalidNumber` when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigErr> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to its value.
    ///
    /// Unknown `SCHEDULING_METHOD` and `GROUP_SIZING` values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigErr> {
        let defaults = Config::default();

        let method = match lookup("SCHEDULING_METHOD") {
            Some(value) => <Method as ValueEnum>::from_str(&value, true).unwrap_or_else(|_| {
                warn!("Unknown SCHEDULING_METHOD '{}', using predefined", value);
                Method::Predefined
            }),
            None => defaults.method,
        };

        let sizing = match lookup("GROUP_SIZING") {
            Some(value) => <Sizing as ValueEnum>::from_str(&value, true).unwrap_or_else(|_| {
                warn!("Unknown GROUP_SIZING '{}', using cap", value);
                Sizing::Cap
            }),
            None => defaults.sizing,
        };

        Ok(Self {
            interests_csv: lookup("INTERESTS_CSV").map_or(defaults.interests_csv, PathBuf::from),
            method,
            sizing,
            max_per_group: number(&lookup, "MAX_PER_GROUP")?.unwrap_or(defaults.max_per_group),
            min_per_group: number(&lookup, "MIN_PER_GROUP")?.unwrap_or(defaults.min_per_group),
            top_n: number(&lookup, "TOP_N")?.unwrap_or(defaults.top_n),
            min_rating: number(&lookup, "MIN_RATING")?.unwrap_or(defaults.min_rating),
            iterations: number(&lookup, "SHUFFLE_ITERATIONS")?.unwrap_or(defaults.iterations),
            seed: number(&lookup, "SHUFFLE_SEED")?,
            ..defaults
        })
    }

    /// Overrides settings with every flag given on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(csv) = &cli.csv {
            self.interests_csv = csv.clone();
        }
        if let Some(layout) = &cli.layout {
            self.layout = Some(layout.clone());
        }
        self.method = cli.method.unwrap_or(self.method);
        self.sizing = cli.sizing.unwrap_or(self.sizing);
        self.selection = cli.selection.unwrap_or(self.selection);
        self.max_per_group = cli.max.unwrap_or(self.max_per_group);
        self.min_per_group = cli.min.unwrap_or(self.min_per_group);
        self.top_n = cli.top_n.unwrap_or(self.top_n);
        self.min_rating = cli.min_rating.unwrap_or(self.min_rating);
        self.iterations = cli.iterations.unwrap_or(self.iterations);
        self.num_sessions = cli.sessions.unwrap_or(self.num_sessions);
        self.topics_per_session = cli.topics_per_session.unwrap_or(self.topics_per_session);
        self.seed = cli.seed.or(self.seed);
        self.json |= cli.json;
    }

    pub fn selection(&self) -> Selection {
        match self.selection {
            SelectionKind::Ranked => Selection::Ranked,
            SelectionKind::TopN => Selection::TopN {
                n: self.top_n,
                min_rating: self.min_rating,
            },
            SelectionKind::Threshold => Selection::Threshold { min_rating: self.min_rating },
            SelectionKind::Max => Selection::MaxValue,
        }
    }

    pub fn size_policy(&self) -> SizePolicy {
        match self.sizing {
            Sizing::Cap => SizePolicy::HardCap { max_per_group: self.max_per_group },
            Sizing::Rebalance => SizePolicy::Rebalance {
                min_per_group: self.min_per_group,
                max_per_group: self.max_per_group,
            },
        }
    }

    /// Builds the scheduling method, loading the layout file when one is configured.
    ///
    /// # Errors
    /// Returns a `LayoutErr` when the layout file is missing or malformed.
    pub fn scheduling_method(&self) -> Result<SchedulingMethod, LayoutErr> {
        match self.method {
            Method::Predefined => {
                let layout = match &self.layout {
                    Some(path) => SessionLayout::from_json_path(path)?,
                    None => SessionLayout::predefined(),
                };
                Ok(SchedulingMethod::Predefined(layout))
            },
            Method::Shuffle => {
                if self.layout.is_some() {
                    warn!("The shuffle method generates its own layouts, ignoring the layout file");
                }
                Ok(SchedulingMethod::Shuffle(ShuffleOptions {
                    iterations: self.iterations,
                    num_sessions: self.num_sessions,
                    topics_per_session: self.topics_per_session,
                    seed: self.seed,
                }))
            },
        }
    }
}

fn number<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, ConfigErr> {
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigErr::InvalidNumber { var, value })
        })
        .transpose()
}
