//! vocadeck CLI: drill a two-way vocabulary deck from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vocadeck", version, about = "Two-way vocabulary flashcard deck")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Card store JSON file (overrides the config)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Corpus directory (overrides the config)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and an example corpus file
    Init,

    /// Sync the store with the corpus directory
    Scan {
        /// Print the sync report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start a new day: re-prime the study deck and pull in new and review cards
    NewDay,

    /// Drill the study deck
    Study {
        /// Seed for card and direction selection
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show deck counts
    Status,

    /// Convert a legacy store file in place, keeping a .bak copy
    Migrate,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vocadeck=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = || {
        commands::resolve_config(cli.config.as_deref(), cli.store.clone(), cli.corpus.clone())
    };

    let result = match cli.command {
        Commands::Init => commands::init::execute(cli.corpus.clone()),
        Commands::Scan { json } => config().and_then(|c| commands::scan::execute(&c, json)),
        Commands::NewDay => config().and_then(|c| commands::new_day::execute(&c)),
        Commands::Study { seed } => config().and_then(|c| commands::study::execute(&c, seed)),
        Commands::Status => config().and_then(|c| commands::status::execute(&c)),
        Commands::Migrate => config().and_then(|c| commands::migrate::execute(&c)),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
