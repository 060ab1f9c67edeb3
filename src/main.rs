mod config;
mod output;

use clap::Parser;
use config::{Config, Method, SelectionKind, Sizing};
use scheduler::{plan, InterestIndex, InterestTable, TopicGroups};
use std::error::Error;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "tablesort", version, about = "Sort conference participants into parallel session tables by interest")]
pub struct Cli {
    /// Interests CSV, the first column holds names and every other column a topic
    pub csv: Option<PathBuf>,

    /// How topics are mapped onto sessions
    #[arg(long, value_enum)]
    pub method: Option<Method>,

    /// Cap groups while packing, or split and merge them afterwards
    #[arg(long, value_enum)]
    pub sizing: Option<Sizing>,

    /// Who joins a topic group
    #[arg(long, value_enum)]
    pub selection: Option<SelectionKind>,

    /// JSON session layout replacing the built-in one
    #[arg(long)]
    pub layout: Option<PathBuf>,

    /// Largest group size
    #[arg(long)]
    pub max: Option<usize>,

    /// Smallest group size when rebalancing
    #[arg(long)]
    pub min: Option<usize>,

    /// Favourite topics considered per participant
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Ratings must be above this to count as an interest
    #[arg(long)]
    pub min_rating: Option<u8>,

    /// Random layouts tried by the shuffle method
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Sessions in a shuffled layout
    #[arg(long)]
    pub sessions: Option<usize>,

    /// Topics per session in a shuffled layout
    #[arg(long)]
    pub topics_per_session: Option<usize>,

    /// Seed for reproducible shuffles
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout only carries the schedule
    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true);
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut config = Config::from_env()?;
    config.apply_cli(cli);
    info!("{:?}", config);

    let table = InterestTable::from_path(&config.interests_csv)?;
    if table.is_empty() {
        warn!("{} lists no participants, nothing to schedule", config.interests_csv.display());
        return Ok(());
    }

    let interests = InterestIndex::from_table(&table, config.top_n, config.min_rating);
    let groups = TopicGroups::build(&table, config.selection());
    let method = config.scheduling_method()?;
    let plan = plan(&table, &groups, &interests, &method, config.size_policy())?;
    let volunteers = table.volunteers();

    let mut out = BufWriter::new(io::stdout().lock());
    if config.json {
        let happiness = (config.method == Method::Shuffle).then_some(plan.happiness);
        output::write_json(&mut out, &plan.schedule, &volunteers, happiness)?;
    } else {
        output::write_text(&mut out, &plan.schedule, &volunteers)?;
    }
    out.flush()?;

    Ok(())
}
