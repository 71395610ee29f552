use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;

use error::CliResult;

#[derive(Parser)]
#[command(name = "hiibox")]
#[command(about = "HiiBox CLI - Reward draws and box inventory for HiiBox campaigns")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the campaign database, import catalogues and set the supply
    Init {
        /// Campaign configuration file
        #[arg(short, long, default_value = "campaign.yaml")]
        config: PathBuf,
    },

    /// Replace the reward table from a rewards CSV
    ImportRewards {
        /// Campaign configuration file
        #[arg(short, long, default_value = "campaign.yaml")]
        config: PathBuf,

        /// Rewards CSV (defaults to the one named in the config)
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Upsert task definitions from a tasks CSV
    ImportTasks {
        /// Campaign configuration file
        #[arg(short, long, default_value = "campaign.yaml")]
        config: PathBuf,

        /// Tasks CSV (defaults to the one named in the config)
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Print the probability of every reward
    Odds {
        /// Campaign configuration file
        #[arg(short, long, default_value = "campaign.yaml")]
        config: PathBuf,

        /// Only show the rewards of this box tier
        #[arg(short, long)]
        tier: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run draws against the stored table and compare with the configured odds
    Simulate {
        /// Campaign configuration file
        #[arg(short, long, default_value = "campaign.yaml")]
        config: PathBuf,

        /// Number of draws
        #[arg(short, long, default_value = "1000000")]
        draws: u64,

        /// Seed for a reproducible run
        #[arg(short, long)]
        seed: Option<u64>,

        /// Draw from this box tier only
        #[arg(short, long)]
        tier: Option<String>,
    },

    /// Show campaign inventory and reward distribution
    Stats {
        /// Campaign configuration file
        #[arg(short, long, default_value = "campaign.yaml")]
        config: PathBuf,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Grow the campaign supply
    AddSupply {
        /// Campaign configuration file
        #[arg(short, long, default_value = "campaign.yaml")]
        config: PathBuf,

        /// Boxes to add
        #[arg(short, long)]
        boxes: u64,
    },

    /// Mirror a wallet's on-chain boxes into the ledger
    Reconcile {
        /// Campaign configuration file
        #[arg(short, long, default_value = "campaign.yaml")]
        config: PathBuf,

        /// Wallet address (0x-prefixed)
        #[arg(short, long)]
        wallet: String,
    },

    /// Record a task for a wallet and credit the keys it earns
    RecordTask {
        /// Campaign configuration file
        #[arg(short, long, default_value = "campaign.yaml")]
        config: PathBuf,

        /// Wallet address (0x-prefixed)
        #[arg(short, long)]
        wallet: String,

        /// Task id from the tasks catalogue
        #[arg(short, long)]
        task: String,

        /// The verification oracle confirmed the task (ignored for NFT tasks)
        #[arg(long)]
        verified: bool,
    },

    /// Open a box for a wallet
    OpenBox {
        /// Campaign configuration file
        #[arg(short, long, default_value = "campaign.yaml")]
        config: PathBuf,

        /// Wallet address (0x-prefixed)
        #[arg(short, long)]
        wallet: String,

        /// Specific box token to open
        #[arg(short, long)]
        box_id: Option<u64>,

        /// Box tier to open (defaults to the standard box)
        #[arg(short, long)]
        tier: Option<String>,

        /// Burn the box token and attach the transaction hash
        #[arg(long)]
        burn: bool,
    },

    /// Write a compact read-only copy of the campaign database
    Backup {
        /// Campaign configuration file
        #[arg(short, long, default_value = "campaign.yaml")]
        config: PathBuf,

        /// Backup file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check inventory, distribution and (optionally) one account for drift
    Audit {
        /// Campaign configuration file
        #[arg(short, long, default_value = "campaign.yaml")]
        config: PathBuf,

        /// Wallet to audit as well
        #[arg(short, long)]
        wallet: Option<String>,
    },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { config } => commands::init::execute(config).await,

        Commands::ImportRewards { config, csv } => {
            commands::import_rewards::execute(config, csv).await
        }

        Commands::ImportTasks { config, csv } => commands::import_tasks::execute(config, csv).await,

        Commands::Odds { config, tier, json } => {
            commands::odds::execute(config, tier, json).await
        }

        Commands::Simulate {
            config,
            draws,
            seed,
            tier,
        } => commands::simulate::execute(config, draws, seed, tier).await,

        Commands::Stats { config, json } => commands::stats::execute(config, json).await,

        Commands::AddSupply { config, boxes } => commands::add_supply::execute(config, boxes).await,

        Commands::Reconcile { config, wallet } => {
            commands::reconcile::execute(config, wallet).await
        }

        Commands::RecordTask {
            config,
            wallet,
            task,
            verified,
        } => commands::record_task::execute(config, wallet, task, verified).await,

        Commands::OpenBox {
            config,
            wallet,
            box_id,
            tier,
            burn,
        } => commands::open_box::execute(config, wallet, box_id, tier, burn).await,

        Commands::Backup { config, output } => commands::backup::execute(config, output).await,

        Commands::Audit { config, wallet } => commands::audit::execute(config, wallet).await,
    }
}
