//! Transfer workflows between the exchange and the wallet

pub mod orchestrator;
pub mod poller;
pub mod types;

#[cfg(test)]
pub(crate) mod fakes;

pub use orchestrator::{
    SweepOutcome, TransferOrchestrator, TransferSettings, WithdrawalOutcome,
};
pub use poller::{Confirmation, ConfirmationRule, DepositConfirmationPoller, PollPolicy};
pub use types::{Transaction, TransactionStatus, WalletTransferContext};
