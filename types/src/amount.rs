//! Token amount type.
//!
//! Amounts are kept in memory as raw unscaled integers (u128) exactly as the
//! protocol declares them. Durable records carry the human-scaled fixed-point
//! form `raw / 10^decimals`, rendered with exactly `decimals` fractional digits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use crate::TypesError;

/// Raw (unscaled) token amount.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Render as a fixed-point decimal string scaled by `10^-decimals`.
    ///
    /// `TokenAmount::new(1000).to_scaled_string(2) == "10.00"`.
    pub fn to_scaled_string(&self, decimals: u8) -> String {
        let digits = self.0.to_string();
        let width = usize::from(decimals);
        if width == 0 {
            return digits;
        }
        let padded = format!("{:0>w$}", digits, w = width + 1);
        let split = padded.len() - width;
        format!("{}.{}", &padded[..split], &padded[split..])
    }

    /// Parse a fixed-point decimal string produced by [`to_scaled_string`]
    /// back into a raw amount. Fewer fractional digits than `decimals` are
    /// accepted; more are rejected since they cannot be represented exactly.
    ///
    /// [`to_scaled_string`]: TokenAmount::to_scaled_string
    pub fn from_scaled_str(s: &str, decimals: u8) -> Result<Self, TypesError> {
        let invalid = || TypesError::InvalidAmount(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        let width = usize::from(decimals);
        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty()
            || !all_digits(int_part)
            || !all_digits(frac_part)
            || frac_part.len() > width
        {
            return Err(invalid());
        }
        let mut combined = String::with_capacity(int_part.len() + width);
        combined.push_str(int_part);
        combined.push_str(frac_part);
        combined.extend(std::iter::repeat('0').take(width - frac_part.len()));
        combined.parse::<u128>().map(Self).map_err(|_| invalid())
    }
}

impl Add for TokenAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for TokenAmount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for TokenAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a TokenAmount> for TokenAmount {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
