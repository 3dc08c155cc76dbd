use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use topicrag::cli::{self, ConfigOverrides};

#[derive(Parser)]
#[command(name = "topicrag")]
#[command(about = "Topic-narrowed retrieval-augmented question answering", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Corpus file: SQuAD-style .json or topic/passage .jsonl
    #[arg(long, global = true, default_value = "corpus.json")]
    corpus: PathBuf,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the corpus topics in retrieval order
    Topics,

    /// Run two-stage retrieval for a query
    Retrieve {
        /// Query text
        #[arg(short, long)]
        query: String,

        /// Also list the N best-matching topics
        #[arg(long, default_value = "5")]
        top_topics: usize,
    },

    /// Answer questions grounded on the retrieved passage
    Ask {
        /// Question to answer (repeatable)
        #[arg(short, long = "question", required = true)]
        questions: Vec<String>,

        /// Print the prompt sent to the generator
        #[arg(long)]
        show_prompt: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "topicrag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli::load_config(cli.config.as_deref(), &cli.overrides)?;

    match cli.command {
        Commands::Topics => {
            cli::topics(&config, &cli.corpus)?;
        }

        Commands::Retrieve { query, top_topics } => {
            cli::retrieve(&config, &cli.corpus, &query, top_topics)?;
        }

        Commands::Ask {
            questions,
            show_prompt,
        } => {
            cli::ask(&config, &cli.corpus, &questions, show_prompt)?;
        }
    }

    Ok(())
}
