use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "prestasync")]
#[command(about = "One-way PrestaShop → catalog sync connector")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one full catalog sync pass
    Sync {
        /// Sync into an in-memory catalog instead of Postgres and print
        /// the summary; nothing is persisted
        #[arg(long)]
        dry_run: bool,
    },
    /// List recent sync runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = prestasync_core::load_app_config()?;

    let filter = EnvFilter::try_from_env("PRESTASYNC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync { dry_run } => commands::sync::run(&config, dry_run).await,
        Commands::Runs { limit } => commands::runs::run(&config, limit).await,
    }
}
