//! Exact on-chain amounts
//!
//! Balances, reserves and fees are non-negative integers in the chain's
//! smallest unit (nanoton on TON). They are held as [`BigUint`] end to end:
//! a value is never routed through `f64`, so amounts above 2^53 stay exact.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Arbitrary-precision non-negative amount in the chain's smallest unit
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigUint);

impl Amount {
    pub fn zero() -> Self {
        Self(BigUint::default())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == BigUint::default()
    }

    /// Subtract `rhs`, returning `None` if the result would be negative
    pub fn checked_sub(&self, rhs: &Amount) -> Option<Amount> {
        if rhs.0 > self.0 {
            None
        } else {
            Some(Amount(&self.0 - &rhs.0))
        }
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Render in whole units with `decimals` fractional digits, trailing
    /// zeros trimmed (`1500000000` with 9 decimals is `"1.5"`).
    pub fn to_decimal_string(&self, decimals: u32) -> String {
        let digits = self.0.to_string();
        let decimals = decimals as usize;
        if decimals == 0 {
            return digits;
        }

        let (int_part, frac_part) = if digits.len() > decimals {
            let split = digits.len() - decimals;
            (digits[..split].to_string(), digits[split..].to_string())
        } else {
            ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
        };

        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.is_empty() {
            int_part
        } else {
            format!("{}.{}", int_part, frac_part)
        }
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Amount {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl std::ops::Add<&Amount> for &Amount {
    type Output = Amount;

    fn add(self, rhs: &Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl FromStr for Amount {
    type Err = Error;

    /// Parse a base-10 integer string. Signs, separators, whitespace and
    /// decimal points are rejected.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidAmount("empty amount".to_string()));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAmount(format!("not an unsigned integer: {:?}", s)));
        }
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(Amount)
            .ok_or_else(|| Error::InvalidAmount(format!("not an unsigned integer: {:?}", s)))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an unsigned integer or a string of decimal digits")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Amount, E> {
        v.parse().map_err(|e: Error| E::custom(e))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> std::result::Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Amount, E> {
        u64::try_from(v)
            .map(Amount::from)
            .map_err(|_| E::custom(format!("amount must not be negative: {}", v)))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Amount, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

/// Breakdown of a sweep: what the wallet holds and what may leave it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepBreakdown {
    pub gross: Amount,
    pub reserve: Amount,
    pub fee: Amount,
    pub net: Amount,
}

/// Compute `gross - reserve - fee` exactly.
///
/// Fails with [`Error::InsufficientFunds`] unless the result is strictly
/// positive. A shortfall is never clamped to zero.
pub fn net_transferable(gross: &Amount, reserve: &Amount, fee: &Amount) -> Result<SweepBreakdown> {
    let deductions = reserve + fee;
    match gross.checked_sub(&deductions) {
        Some(net) if !net.is_zero() => Ok(SweepBreakdown {
            gross: gross.clone(),
            reserve: reserve.clone(),
            fee: fee.clone(),
            net,
        }),
        _ => Err(Error::InsufficientFunds {
            gross: gross.clone(),
            reserve: reserve.clone(),
            fee: fee.clone(),
        }),
    }
}
