//! Error types for the bridge

use std::time::Duration;

use thiserror::Error;

use crate::amount::Amount;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the bridge
#[derive(Error, Debug)]
pub enum Error {
    // Collaborator errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response format: {0}")]
    Format(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Exchange rejected request with status {status}: {body}")]
    ExchangeRejected { status: u16, body: String },

    #[error("Chain provider rejected transfer with status {status}: {body}")]
    TransferRejected { status: u16, body: String },

    // Local policy errors
    #[error("Insufficient funds: balance {gross} does not cover reserve {reserve} + fee {fee}")]
    InsufficientFunds {
        gross: Amount,
        reserve: Amount,
        fee: Amount,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Confirmation wait errors
    #[error("Confirmation wait cancelled")]
    Cancelled,

    #[error("Deposit not confirmed after {attempts} balance checks ({elapsed:?})")]
    ConfirmationTimeout { attempts: u32, elapsed: Duration },

    #[error("Invalid transaction transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Workflow phase wrappers
    #[error("Balance check failed: {0}")]
    BalanceCheckFailed(#[source] Box<Error>),

    #[error("Withdrawal failed: {0}")]
    WithdrawalFailed(#[source] Box<Error>),

    #[error("Deposit confirmation failed: {0}")]
    ConfirmationFailed(#[source] Box<Error>),

    #[error("Transfer failed: {0}")]
    TransferFailed(#[source] Box<Error>),
}

/// Workflow phase an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    BalanceCheck,
    Withdrawal,
    Confirmation,
    Transfer,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::BalanceCheck => "balance-check",
            Phase::Withdrawal => "withdrawal",
            Phase::Confirmation => "confirmation",
            Phase::Transfer => "transfer",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Workflow phase that failed, if this is a wrapped phase error
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::BalanceCheckFailed(_) => Some(Phase::BalanceCheck),
            Error::WithdrawalFailed(_) => Some(Phase::Withdrawal),
            Error::ConfirmationFailed(_) => Some(Phase::Confirmation),
            Error::TransferFailed(_) => Some(Phase::Transfer),
            _ => None,
        }
    }

    /// Innermost error beneath any phase wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::BalanceCheckFailed(inner)
            | Error::WithdrawalFailed(inner)
            | Error::ConfirmationFailed(inner)
            | Error::TransferFailed(inner) => inner.root_cause(),
            other => other,
        }
    }

    pub(crate) fn balance_check(e: Error) -> Self {
        Error::BalanceCheckFailed(Box::new(e))
    }

    pub(crate) fn withdrawal(e: Error) -> Self {
        Error::WithdrawalFailed(Box::new(e))
    }

    pub(crate) fn confirmation(e: Error) -> Self {
        Error::ConfirmationFailed(Box::new(e))
    }

    pub(crate) fn transfer(e: Error) -> Self {
        Error::TransferFailed(Box::new(e))
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Format(e.to_string())
        } else {
            Error::Transport(e.to_string())
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
