//! Transfer workflows
//!
//! Exchange → wallet: withdraw, then poll the destination until the
//! deposit lands. Wallet → exchange: read the wallet balance, keep the
//! reserve, pay the fee, send the rest.
//!
//! Every failure is returned wrapped in the phase it happened in
//! (balance check, withdrawal, confirmation, transfer).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::poller::{Confirmation, ConfirmationRule, DepositConfirmationPoller, PollPolicy};
use super::types::{Transaction, TransactionStatus, WalletTransferContext};
use crate::amount::{net_transferable, Amount, SweepBreakdown};
use crate::chain::address::short;
use crate::chain::{validate_address, BalanceOracle, ChainTransferClient, TransferReceipt};
use crate::config::{Config, ConfirmationRuleKind};
use crate::error::{Error, Result};
use crate::exchange::{ExchangeWithdrawClient, WithdrawReceipt};

/// Fixed inputs shared by every flow of an orchestrator
#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Exchange currency code, e.g. "TON"
    pub currency: String,
    /// Network recorded on swept transactions
    pub chain_network: String,
    pub reserve: Amount,
    pub fee: Amount,
    pub rule: ConfirmationRuleKind,
}

impl TransferSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            currency: config.exchange.currency.clone(),
            chain_network: config.chain.network.clone(),
            reserve: config.sweep.reserve.clone(),
            fee: config.sweep.fee.clone(),
            rule: config.confirmation.rule,
        }
    }
}

/// Result of a completed withdrawal
#[derive(Debug, Clone)]
pub struct WithdrawalOutcome {
    pub receipt: WithdrawReceipt,
    pub confirmation: Confirmation,
}

/// Result of a submitted sweep
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// Left in `Submitted`: exchange-side credit is not polled
    pub transaction: Transaction,
    pub breakdown: SweepBreakdown,
    pub receipt: TransferReceipt,
}

/// Composes the collaborators into the two transfer workflows.
///
/// Holds no per-flow state, so independent flows may run concurrently on
/// one instance.
pub struct TransferOrchestrator {
    exchange: Arc<dyn ExchangeWithdrawClient>,
    oracle: Arc<dyn BalanceOracle>,
    chain: Arc<dyn ChainTransferClient>,
    poller: DepositConfirmationPoller,
    settings: TransferSettings,
}

impl TransferOrchestrator {
    pub fn new(
        exchange: Arc<dyn ExchangeWithdrawClient>,
        oracle: Arc<dyn BalanceOracle>,
        chain: Arc<dyn ChainTransferClient>,
        policy: PollPolicy,
        settings: TransferSettings,
    ) -> Self {
        let poller = DepositConfirmationPoller::new(oracle.clone(), policy);
        Self {
            exchange,
            oracle,
            chain,
            poller,
            settings,
        }
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Withdraw `transaction.amount` from the exchange to
    /// `transaction.to_address` and wait for it to arrive.
    ///
    /// `transaction` must be `Pending`; it ends `Confirmed` on success and
    /// `Failed` on any error.
    pub async fn withdraw_to_wallet(
        &self,
        transaction: &mut Transaction,
        cancel: &CancellationToken,
    ) -> Result<WithdrawalOutcome> {
        if transaction.status() != TransactionStatus::Pending {
            return Err(Error::InvalidTransition {
                from: transaction.status().to_string(),
                to: TransactionStatus::Submitted.to_string(),
            });
        }
        if let Err(e) = validate_address(&transaction.to_address) {
            transaction.mark_failed();
            return Err(Error::withdrawal(e));
        }

        let to_address = transaction.to_address.clone();
        info!(
            "Withdrawal {}: {} {} to {} on {}",
            transaction.id,
            transaction.amount,
            self.settings.currency,
            short(&to_address),
            transaction.network
        );

        let rule = match self.settings.rule {
            ConfirmationRuleKind::Positive => ConfirmationRule::Positive,
            ConfirmationRuleKind::Delta => match self.oracle.get_balance(&to_address).await {
                Ok(baseline) => {
                    info!("Baseline balance of {}: {}", short(&to_address), baseline);
                    ConfirmationRule::Delta { baseline }
                }
                Err(e) => {
                    error!("Withdrawal {}: baseline balance check failed: {}", transaction.id, e);
                    transaction.mark_failed();
                    return Err(Error::balance_check(e));
                }
            },
        };

        let receipt = match self
            .exchange
            .withdraw(
                &self.settings.currency,
                &transaction.amount,
                &to_address,
                &transaction.network,
            )
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                error!("Withdrawal {} rejected: {}", transaction.id, e);
                transaction.mark_failed();
                return Err(Error::withdrawal(e));
            }
        };

        transaction.mark_submitted()?;
        info!(
            "Withdrawal {} acknowledged (status {}, exchange id {}), waiting for deposit",
            transaction.id,
            receipt.status,
            receipt.withdrawal_id.as_deref().unwrap_or("-")
        );

        match self.poller.wait_for_deposit(&to_address, &rule, cancel).await {
            Ok(confirmation) => {
                transaction.mark_confirmed()?;
                info!(
                    "Withdrawal {} confirmed: balance {} after {} checks",
                    transaction.id, confirmation.balance, confirmation.attempts
                );
                Ok(WithdrawalOutcome {
                    receipt,
                    confirmation,
                })
            }
            Err(e) => {
                error!("Withdrawal {} not confirmed: {}", transaction.id, e);
                transaction.mark_failed();
                Err(Error::confirmation(e))
            }
        }
    }

    /// Read the source balance and work out what a sweep would send,
    /// without submitting anything.
    pub async fn preview_sweep(&self, context: &WalletTransferContext) -> Result<SweepBreakdown> {
        let gross = self
            .oracle
            .get_balance(context.from_address())
            .await
            .map_err(Error::balance_check)?;

        let breakdown = net_transferable(&gross, &self.settings.reserve, &self.settings.fee)
            .map_err(|e| {
                warn!(
                    "Sweep from {} refused: {}",
                    short(context.from_address()),
                    e
                );
                e
            })?;

        info!(
            "Sweep from {} (account {}): balance {} - reserve {} - fee {} = {}",
            short(context.from_address()),
            context.account_identifier(),
            breakdown.gross,
            breakdown.reserve,
            breakdown.fee,
            breakdown.net
        );

        Ok(breakdown)
    }

    /// Send everything above reserve + fee from the wallet to the exchange
    /// deposit address.
    ///
    /// Fails with `InsufficientFunds` before any transfer is attempted when
    /// the balance does not cover reserve and fee.
    pub async fn sweep_to_exchange(&self, context: &WalletTransferContext) -> Result<SweepOutcome> {
        let breakdown = self.preview_sweep(context).await?;

        let mut transaction = Transaction::new(
            breakdown.net.clone(),
            context.to_address(),
            self.settings.chain_network.clone(),
        );

        let receipt = match self
            .chain
            .transfer(context.provider_endpoint(), context.to_address(), &breakdown.net)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                error!("Sweep {} failed: {}", transaction.id, e);
                transaction.mark_failed();
                return Err(Error::transfer(e));
            }
        };

        transaction.mark_submitted()?;
        info!(
            "Sweep {} submitted: {} to {} (status {})",
            transaction.id,
            breakdown.net,
            short(context.to_address()),
            receipt.status
        );

        Ok(SweepOutcome {
            transaction,
            breakdown,
            receipt,
        })
    }
}
