//! Exchange collaborators
//!
//! [`ExchangeWithdrawClient`] is the seam the orchestrator withdraws
//! through; [`OkxClient`] implements it against the OKX REST API with a
//! pluggable [`RequestSigner`].

pub mod okx;
pub mod signer;
pub mod types;

use async_trait::async_trait;

use crate::amount::Amount;
use crate::error::Result;

pub use okx::{ExchangeCredentials, OkxClient};
pub use signer::{HmacSha256Signer, RequestSigner};
pub use types::WithdrawReceipt;

/// Submits withdrawals from the exchange account
#[async_trait]
pub trait ExchangeWithdrawClient: Send + Sync {
    /// Request a withdrawal of `amount` of `currency` to `to_address`.
    ///
    /// One authenticated call. Fails with `Auth` on credential/signing
    /// problems, `ExchangeRejected` on a non-success status and
    /// `Transport` on network failure. Success means acknowledged, not
    /// arrived.
    async fn withdraw(
        &self,
        currency: &str,
        amount: &Amount,
        to_address: &str,
        network: &str,
    ) -> Result<WithdrawReceipt>;
}
