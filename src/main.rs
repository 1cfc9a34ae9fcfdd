//! CEX Bridge - move funds between an exchange account and an on-chain wallet
//!
//! # WARNING
//! - Withdrawals and sweeps move real funds and cannot be undone.
//! - Double-check addresses; a wrong destination is unrecoverable.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

// Use the library crate
use cex_bridge::cli::commands;
use cex_bridge::config::Config;

/// CEX Bridge - exchange withdrawals and wallet sweeps
#[derive(Parser)]
#[command(name = "bridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, env = "BRIDGE_CONFIG", default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Withdraw from the exchange to a wallet and wait for the deposit
    Withdraw {
        /// Amount in the chain's smallest unit (nanoton for TON)
        #[arg(long)]
        amount: String,

        /// Destination wallet address
        #[arg(long)]
        to: String,

        /// Withdrawal network (default: exchange.network)
        #[arg(long)]
        network: Option<String>,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Sweep a wallet's balance above reserve + fee to the exchange
    Sweep {
        /// Source wallet address
        #[arg(long)]
        from: String,

        /// Exchange deposit address
        #[arg(long)]
        to: String,

        /// Exchange account the deposit is credited to
        #[arg(long, default_value = "main")]
        account: String,

        /// Wallet provider endpoint (default: chain.transfer_endpoint)
        #[arg(long)]
        endpoint: Option<String>,

        /// Show the breakdown only, don't transfer
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Show the balance of an address
    Balance {
        /// Wallet address
        address: String,
    },

    /// Show current configuration (secrets masked)
    Config,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("cex_bridge=info".parse().unwrap());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.json_logs);

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration loaded from {}", cli.config);

    // Execute command
    let result = match cli.command {
        Commands::Withdraw {
            amount,
            to,
            network,
            force,
        } => commands::withdraw(&config, &amount, &to, network, force).await,
        Commands::Sweep {
            from,
            to,
            account,
            endpoint,
            dry_run,
            force,
        } => commands::sweep(&config, &from, &to, &account, endpoint, dry_run, force).await,
        Commands::Balance { address } => commands::balance(&config, &address).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
