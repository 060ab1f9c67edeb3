use clap::Parser;
use dotenvy::dotenv;
use scheduler::utils::make_interest_table;
use scheduler::{InterestsErr, SessionLayout};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
enum GenErr {
    #[error("{0}")]
    Args(String),
    #[error("Could not write the interests table: {0}")]
    Interests(#[from] InterestsErr),
    #[error("Could not create the output file: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser)]
#[command(author, version, about = "Generate an interests CSV filled with fake participants")]
struct Cli {
    /// Number of participants
    #[arg(long, default_value = "60")]
    participants: usize,

    /// Comma separated topic columns, defaults to the topics of the built-in layout
    #[arg(long, value_delimiter = ',')]
    topics: Vec<String>,

    /// Seed for reproducible tables
    #[arg(long)]
    seed: Option<u64>,

    /// Output file, stdout when omitted
    #[arg(long)]
    out: Option<PathBuf>,
}

impl Cli {
    fn topics(&self) -> Result<Vec<String>, GenErr> {
        if self.topics.is_empty() {
            return Ok(SessionLayout::predefined_topics());
        }

        let topics: Vec<String> = self.topics
            .iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect();
        if topics.is_empty() {
            return Err(GenErr::Args(String::from("--topics must name at least one topic")));
        }
        Ok(topics)
    }
}

fn generate(cli: &Cli) -> Result<(), GenErr> {
    let topics = cli.topics()?;
    let seed = cli.seed.unwrap_or_else(rand::random);
    let table = make_interest_table(cli.participants, &topics, seed);

    match &cli.out {
        Some(path) => {
            table.write_csv(BufWriter::new(File::create(path)?))?;
            eprintln!("Wrote {} participants and {} topics to {} (seed {})", table.len(), topics.len(), path.display(), seed);
        },
        None => {
            let mut stdout = io::stdout().lock();
            table.write_csv(&mut stdout)?;
            stdout.flush()?;
        },
    }

    Ok(())
}

fn main() {
    dotenv().ok();

    let cli = Cli::parse();
    if let Err(e) = generate(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
