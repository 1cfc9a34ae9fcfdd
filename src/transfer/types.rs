//! Transfer domain types

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::amount::Amount;
use crate::chain::validate_address;
use crate::error::{Error, Result};

/// Lifecycle of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Created, nothing submitted yet
    Pending,
    /// Accepted by the remote side, not yet confirmed
    Submitted,
    /// Funds observed at the destination
    Confirmed,
    /// Aborted in some phase
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Confirmed | TransactionStatus::Failed)
    }

    fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Submitted) | (Pending, Failed) | (Submitted, Confirmed) | (Submitted, Failed)
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Submitted => "submitted",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A single movement of funds
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Amount in the chain's smallest unit
    pub amount: Amount,
    pub to_address: String,
    /// Chain identifier, e.g. "TON"
    pub network: String,
    status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(amount: Amount, to_address: impl Into<String>, network: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            amount,
            to_address: to_address.into(),
            network: network.into(),
            status: TransactionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Move to `next`, rejecting transitions out of terminal states and
    /// skips over `Submitted`
    pub fn transition(&mut self, next: TransactionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_submitted(&mut self) -> Result<()> {
        self.transition(TransactionStatus::Submitted)
    }

    pub fn mark_confirmed(&mut self) -> Result<()> {
        self.transition(TransactionStatus::Confirmed)
    }

    /// Mark as failed. A terminal transaction is left untouched.
    pub fn mark_failed(&mut self) {
        if !self.status.is_terminal() {
            self.status = TransactionStatus::Failed;
            self.updated_at = Utc::now();
        }
    }
}

/// Immutable description of one wallet → exchange sweep
#[derive(Debug, Clone)]
pub struct WalletTransferContext {
    from_address: String,
    to_address: String,
    provider_endpoint: String,
    account_identifier: String,
}

impl WalletTransferContext {
    /// Build a context, validating both addresses and the endpoint URL
    pub fn new(
        from_address: &str,
        to_address: &str,
        provider_endpoint: &str,
        account_identifier: &str,
    ) -> Result<Self> {
        let from_address = validate_address(from_address)?.to_string();
        let to_address = validate_address(to_address)?.to_string();

        let endpoint = url::Url::parse(provider_endpoint)
            .map_err(|e| Error::Config(format!("Invalid provider endpoint {}: {}", provider_endpoint, e)))?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(Error::Config(format!(
                "Provider endpoint must be http(s): {}",
                provider_endpoint
            )));
        }

        Ok(Self {
            from_address,
            to_address,
            provider_endpoint: provider_endpoint.to_string(),
            account_identifier: account_identifier.to_string(),
        })
    }

    pub fn from_address(&self) -> &str {
        &self.from_address
    }

    pub fn to_address(&self) -> &str {
        &self.to_address
    }

    pub fn provider_endpoint(&self) -> &str {
        &self.provider_endpoint
    }

    pub fn account_identifier(&self) -> &str {
        &self.account_identifier
    }
}
