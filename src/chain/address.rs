//! TON address format checks
//!
//! Accepts the raw form (`<workchain>:<64 hex>`) and the 48-character
//! user-friendly form in either base64 or base64url alphabet. Checksums are
//! left to the chain provider.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

lazy_static! {
    static ref RAW_ADDRESS: Regex = Regex::new(r"^-?[0-9]+:[0-9a-fA-F]{64}$").unwrap();
    static ref FRIENDLY_ADDRESS: Regex = Regex::new(r"^[A-Za-z0-9_\-+/]{48}$").unwrap();
}

/// Validate an address string, returning it trimmed
pub fn validate_address(address: &str) -> Result<&str> {
    let trimmed = address.trim();
    if RAW_ADDRESS.is_match(trimmed) || FRIENDLY_ADDRESS.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(Error::InvalidAddress(address.to_string()))
    }
}

/// Shorten an address for log lines
pub fn short(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        address.to_string()
    } else {
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    }
}
