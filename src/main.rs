//! Codag CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "codag")]
#[command(about = "Static analysis of LLM workflows in source repositories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a repository and emit its workflow graph
    Analyze {
        /// Repository root path
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Analysis config (defaults to codag.toml / codag.yaml in the root)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON file of workflow hints
        #[arg(long)]
        hints: Option<PathBuf>,

        /// Write the snapshot here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the extracted repository structure
    Structure {
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print one file's call graph
    Callgraph {
        file: PathBuf,
    },
    /// Diff two snapshot files; exits with status 1 when they differ
    Diff {
        old: PathBuf,
        new: PathBuf,
    },
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `.env` may carry RUST_LOG
    let _ = dotenvy::dotenv();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("codag={}", log_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze { root, config, hints, output } => {
            tracing::info!("Codag v{}", env!("CARGO_PKG_VERSION"));
            commands::analyze(&root, config.as_deref(), hints.as_deref(), output.as_deref())
        }
        Commands::Structure { root, config } => commands::structure(&root, config.as_deref()),
        Commands::Callgraph { file } => commands::callgraph(&file),
        Commands::Diff { old, new } => {
            if commands::diff(&old, &new)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Version => {
            println!("Codag v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
