//! On-chain collaborators
//!
//! Two capabilities are consumed from the chain side:
//! - [`BalanceOracle`]: read the balance of an address
//! - [`ChainTransferClient`]: submit a transfer from the configured wallet
//!
//! [`TonCenterClient`] implements both over a toncenter-style JSON-RPC
//! provider. Neither retries internally; retry policy belongs to callers.

pub mod address;
pub mod toncenter;
pub mod types;

use async_trait::async_trait;

use crate::amount::Amount;
use crate::error::Result;

pub use address::validate_address;
pub use toncenter::TonCenterClient;

/// Source of current address balances
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Fetch the balance of `address` in the chain's smallest unit.
    ///
    /// One provider round trip. Fails with `Transport` on network/HTTP
    /// failure and `Format` when the payload carries no integer balance.
    async fn get_balance(&self, address: &str) -> Result<Amount>;
}

/// Acknowledgement of a submitted transfer
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub status: u16,
    pub body: String,
}

/// Submits outbound transfers to a chain provider
#[async_trait]
pub trait ChainTransferClient: Send + Sync {
    /// Submit `amount` to `recipient` through `provider_endpoint`.
    ///
    /// Fails with `TransferRejected` on a non-success status.
    async fn transfer(
        &self,
        provider_endpoint: &str,
        recipient: &str,
        amount: &Amount,
    ) -> Result<TransferReceipt>;
}
