//! CEX Bridge Library
//!
//! Moves funds between an exchange account and an on-chain wallet:
//! exchange withdrawals confirmed by watching the destination balance,
//! and wallet sweeps that keep a reserve and pay the network fee.

pub mod amount;
pub mod chain;
pub mod cli;
pub mod config;
pub mod error;
pub mod exchange;
pub mod transfer;

#[cfg(test)]
mod http_stub;

// Re-export commonly used types
pub use amount::Amount;
pub use config::Config;
pub use error::{Error, Result};
