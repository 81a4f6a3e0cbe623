use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Number of cents in one currency unit.
const CENTS_PER_UNIT: u64 = 100;

/// Rate precision: one unit of `Rate` is 1/10000.
const RATE_SCALE: u64 = 10_000;

/// A non-negative currency amount with 0.01 granularity.
///
/// Stored as an integer count of cents so that balances add up exactly.
/// Serialized as a decimal string (`"100.50"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Create from a raw cent count.
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Create from whole currency units.
    pub const fn from_units(units: u64) -> Self {
        Self(units * CENTS_PER_UNIT)
    }

    /// The raw cent count.
    pub const fn cents(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// `self × (1 + rate)`, rounded half-up to the cent.
    pub fn with_rate(self, rate: Rate) -> Result<Amount, CoreError> {
        let scaled = self.0 as u128 * (RATE_SCALE as u128 + rate.0 as u128);
        let rounded = (scaled + RATE_SCALE as u128 / 2) / RATE_SCALE as u128;
        u64::try_from(rounded)
            .map(Amount)
            .map_err(|_| CoreError::InvalidAmount(format!("{} × (1 + {}) overflows", self, rate)))
    }

    /// Sum a sequence of amounts, failing on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Result<Amount, CoreError> {
        amounts.into_iter().try_fold(Amount::ZERO, |acc, a| {
            acc.checked_add(a)
                .ok_or_else(|| CoreError::InvalidAmount("sum overflows".into()))
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / CENTS_PER_UNIT, self.0 % CENTS_PER_UNIT)
    }
}

impl FromStr for Amount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s, 2)
            .map(Amount)
            .ok_or_else(|| CoreError::InvalidAmount(s.to_string()))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A non-negative interest or premium multiplier with 0.0001 granularity.
///
/// Serialized as a decimal string (`"0.05"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rate(u32);

impl Rate {
    pub const ZERO: Rate = Rate(0);

    /// Create from basis points (1 bp = 0.0001).
    pub const fn from_basis_points(bp: u32) -> Self {
        Self(bp)
    }

    pub const fn basis_points(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = RATE_SCALE as u32;
        let frac = format!("{:04}", self.0 % scale);
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            write!(f, "{}", self.0 / scale)
        } else {
            write!(f, "{}.{}", self.0 / scale, frac)
        }
    }
}

impl FromStr for Rate {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s, 4)
            .and_then(|v| u32::try_from(v).ok())
            .map(Rate)
            .ok_or_else(|| CoreError::InvalidRate(s.to_string()))
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse an unsigned decimal string into an integer scaled by `10^digits`.
/// Rejects signs, exponents, and more than `digits` fractional digits.
fn parse_fixed(s: &str, digits: u32) -> Option<u64> {
    let s = s.trim();
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if frac_part.len() > digits as usize {
        return None;
    }
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }

    let int_value: u64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };
    let mut frac_value: u64 = if frac_part.is_empty() {
        0
    } else {
        frac_part.parse().ok()?
    };
    for _ in frac_part.len()..digits as usize {
        frac_value *= 10;
    }

    int_value
        .checked_mul(10u64.pow(digits))?
        .checked_add(frac_value)
}
