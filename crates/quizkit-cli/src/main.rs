//! quizkit CLI — bilingual general-knowledge quiz in the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "quizkit", version, about = "Bilingual general-knowledge quiz")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a quiz interactively
    Play {
        /// Number of questions
        #[arg(long)]
        count: Option<usize>,

        /// Category (e.g. "Science", "Pop Culture", "Random")
        #[arg(long)]
        category: Option<String>,

        /// Difficulty: easy, medium, hard or random
        #[arg(long)]
        difficulty: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Generate questions ahead of time into the cache
    Stock {
        #[arg(long, default_value = "Random")]
        category: String,

        /// Difficulty: easy, medium, hard or random (all three)
        #[arg(long, default_value = "random")]
        difficulty: String,

        /// Questions to keep queued per difficulty
        #[arg(long, default_value = "10")]
        target: usize,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show past results and weekly mission progress
    History {
        /// Delete all recorded results
        #[arg(long)]
        clear: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check bundled question files
    Validate {
        /// Question file or directory of questions_*.json files
        #[arg(long)]
        bank: PathBuf,
    },

    /// Create starter config and a sample question file
    Init,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quizkit=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play {
            count,
            category,
            difficulty,
            config,
        } => commands::play::execute(count, category, difficulty, config).await,
        Commands::Stock {
            category,
            difficulty,
            target,
            config,
        } => commands::stock::execute(category, difficulty, target, config).await,
        Commands::History { clear, config } => commands::history::execute(clear, config),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
