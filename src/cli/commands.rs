//! CLI command implementations

use anyhow::{Context, Result};
use dialoguer::Confirm;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::amount::Amount;
use crate::chain::address::short;
use crate::chain::{validate_address, BalanceOracle, TonCenterClient};
use crate::config::Config;
use crate::exchange::{HmacSha256Signer, OkxClient};
use crate::transfer::{
    PollPolicy, Transaction, TransferOrchestrator, TransferSettings, WalletTransferContext,
};

/// Wire the live clients from configuration
pub fn build_orchestrator(config: &Config) -> Result<TransferOrchestrator> {
    let chain = Arc::new(
        TonCenterClient::new(&config.chain, &config.http)
            .context("Failed to create chain client")?,
    );
    let signer = Arc::new(HmacSha256Signer::new(config.exchange.api_secret.clone()));
    let exchange = Arc::new(
        OkxClient::new(&config.exchange, &config.http, signer)
            .context("Failed to create exchange client")?,
    );

    Ok(TransferOrchestrator::new(
        exchange,
        chain.clone(),
        chain,
        PollPolicy::from(&config.confirmation),
        TransferSettings::from_config(config),
    ))
}

/// Parse a whole number of the chain's smallest unit
fn parse_amount(value: &str) -> Result<Amount> {
    let amount: Amount = value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid amount '{}': {}", value, e))?;
    if amount.is_zero() {
        anyhow::bail!("Amount must be greater than zero");
    }
    Ok(amount)
}

/// Render an amount as `<units> (<decimal> <currency>)`
fn describe(amount: &Amount, config: &Config) -> String {
    format!(
        "{} ({} {})",
        amount,
        amount.to_decimal_string(config.exchange.amount_decimals),
        config.exchange.currency
    )
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    warn!("Received shutdown signal, cancelling");
                    token.cancel();
                }
            }
            _ = token.cancelled() => {}
        }
    });
}

/// Withdraw from the exchange and wait for the deposit to land
pub async fn withdraw(
    config: &Config,
    amount: &str,
    to: &str,
    network: Option<String>,
    force: bool,
) -> Result<()> {
    let amount = parse_amount(amount)?;
    let to = validate_address(to)?.to_string();
    let network = network.unwrap_or_else(|| config.exchange.network.clone());

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Withdraw {} from the exchange to {} on {}?",
                describe(&amount, config),
                to,
                network
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            info!("Withdrawal cancelled by user");
            return Ok(());
        }
    }

    let orchestrator = build_orchestrator(config)?;
    let mut transaction = Transaction::new(amount, to, network);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(&cancel);

    let result = orchestrator.withdraw_to_wallet(&mut transaction, &cancel).await;
    cancel.cancel();

    match result {
        Ok(outcome) => {
            println!("\nWithdrawal confirmed!");
            println!("Transaction: {}", transaction.id);
            if let Some(id) = &outcome.receipt.withdrawal_id {
                println!("Exchange withdrawal id: {}", id);
            }
            println!(
                "Destination balance: {}",
                describe(&outcome.confirmation.balance, config)
            );
            println!(
                "Checks: {}, waited {}s",
                outcome.confirmation.attempts,
                outcome.confirmation.elapsed.as_secs()
            );
            Ok(())
        }
        Err(e) => {
            error!("Withdrawal {} ended {}: {}", transaction.id, transaction.status(), e);
            Err(e.into())
        }
    }
}

/// Sweep the wallet balance above reserve + fee to the exchange deposit address
pub async fn sweep(
    config: &Config,
    from: &str,
    to: &str,
    account: &str,
    endpoint: Option<String>,
    dry_run: bool,
    force: bool,
) -> Result<()> {
    if dry_run {
        warn!("Running in DRY-RUN mode - nothing will be transferred");
    }

    let endpoint = endpoint.unwrap_or_else(|| config.chain.transfer_endpoint().to_string());
    let context = WalletTransferContext::new(from, to, &endpoint, account)?;
    let orchestrator = build_orchestrator(config)?;

    let breakdown = orchestrator.preview_sweep(&context).await?;

    println!("\n=== SWEEP ===\n");
    println!("From:    {}", context.from_address());
    println!("To:      {}", context.to_address());
    println!("Balance: {}", describe(&breakdown.gross, config));
    println!("Reserve: {}", describe(&breakdown.reserve, config));
    println!("Fee:     {}", describe(&breakdown.fee, config));
    println!("Send:    {}", describe(&breakdown.net, config));

    if dry_run {
        info!("DRY-RUN: Would send {} to {}", breakdown.net, short(context.to_address()));
        return Ok(());
    }

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Send {} to {}? This cannot be undone.",
                describe(&breakdown.net, config),
                context.to_address()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            info!("Sweep cancelled by user");
            return Ok(());
        }
    }

    let outcome = orchestrator.sweep_to_exchange(&context).await?;
    if outcome.breakdown.net != breakdown.net {
        warn!(
            "Balance changed since preview: sent {} instead of {}",
            outcome.breakdown.net, breakdown.net
        );
    }

    println!("\nSweep submitted (exchange credit is not tracked)");
    println!("Transaction: {}", outcome.transaction.id);
    println!("Amount: {}", describe(&outcome.transaction.amount, config));
    println!("Provider status: {}", outcome.receipt.status);

    Ok(())
}

/// Show the balance of an address
pub async fn balance(config: &Config, address: &str) -> Result<()> {
    let address = validate_address(address)?;
    let client = TonCenterClient::new(&config.chain, &config.http)
        .context("Failed to create chain client")?;

    let balance = client
        .get_balance(address)
        .await
        .with_context(|| format!("Failed to fetch balance of {}", address))?;

    println!("{}: {}", address, describe(&balance, config));
    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}
