//! Evergreen: recurring-queue publishing daemon.
//!
//! Subcommands:
//! - `daemon`: run the periodic due-queue processor loop

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evergreen_engine::{CadencePolicy, DEFAULT_TICK_INTERVAL_SECS};

mod daemon;

#[derive(Parser)]
#[command(name = "evergreen")]
#[command(about = "Recurring-queue publishing daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the due-queue processor loop
    Daemon {
        /// Owner id the daemon serves
        #[arg(long, env = "EVERGREEN_OWNER", default_value = "local")]
        owner: String,

        /// Processor tick interval in seconds
        #[arg(long, default_value_t = DEFAULT_TICK_INTERVAL_SECS)]
        tick_interval: u64,

        /// Anchor reschedules to the previous due time instead of the
        /// processing time
        #[arg(long)]
        fixed_cadence: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "evergreen=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon {
            owner,
            tick_interval,
            fixed_cadence,
        } => {
            let cadence = if fixed_cadence {
                CadencePolicy::Fixed
            } else {
                CadencePolicy::DriftTolerant
            };
            daemon::run(&owner, tick_interval, cadence).await
        }
    }
}
