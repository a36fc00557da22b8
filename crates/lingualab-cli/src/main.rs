//! lingualab CLI: import dictionaries and train vocabulary from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lingualab", version, about = "Multiple-choice vocabulary trainer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and word list
    Init,

    /// Import a word list as a new dictionary, or replace an existing one
    Import {
        /// CSV file with one `word,translation` pair per line
        #[arg(long)]
        file: PathBuf,

        /// Dictionary name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,

        /// Replace the words of this dictionary instead of creating one
        #[arg(long)]
        replace: Option<i64>,

        /// External id of the uploading user, checked against `moderators`
        #[arg(long)]
        as_user: i64,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List dictionaries
    List {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Train on a dictionary interactively
    Train {
        /// External id of the learner
        #[arg(long)]
        user: i64,

        /// Dictionary id (see `lingualab list`)
        #[arg(long)]
        dictionary: i64,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show learning progress on a dictionary
    Stats {
        /// External id of the learner
        #[arg(long)]
        user: i64,

        /// Dictionary id
        #[arg(long)]
        dictionary: i64,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lingualab=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Import {
            file,
            name,
            replace,
            as_user,
            config,
        } => commands::import::execute(file, name, replace, as_user, config).await,
        Commands::List { config } => commands::list::execute(config).await,
        Commands::Train {
            user,
            dictionary,
            config,
        } => commands::train::execute(user, dictionary, config).await,
        Commands::Stats {
            user,
            dictionary,
            config,
        } => commands::stats::execute(user, dictionary, config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
