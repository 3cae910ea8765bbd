//! Money amounts
//!
//! Prices are held as integer minor units with two decimal places. On the wire
//! they travel as decimal strings (`"12.99"`); inputs may also be JSON numbers.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of decimal places carried by every amount
pub const MINOR_DIGITS: u32 = 2;

const MINOR_FACTOR: i64 = 10i64.pow(MINOR_DIGITS);

/// A monetary amount in minor units (pence, cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

/// Error returned when a money string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyParseError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount: {0}")]
    Invalid(String),
    #[error("amount has more than two decimal places: {0}")]
    TooPrecise(String),
    #[error("amount out of range: {0}")]
    Overflow(String),
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Multiply by `numerator / denominator`, rounding half to even.
    ///
    /// Used for tax calculation where the rate is expressed as a fraction.
    pub fn mul_ratio_half_even(&self, numerator: i64, denominator: i64) -> Money {
        debug_assert!(denominator > 0);
        let product = self.0 as i128 * numerator as i128;
        let den = denominator as i128;

        let negative = product < 0;
        let magnitude = product.abs();
        let mut quotient = magnitude / den;
        let remainder = magnitude % den;

        let twice = remainder * 2;
        if twice > den || (twice == den && quotient % 2 == 1) {
            quotient += 1;
        }

        let signed = if negative { -quotient } else { quotient };
        Money(signed.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (unsigned, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(MoneyParseError::Invalid(s.to_string()));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(MoneyParseError::Invalid(s.to_string()));
        }

        // Trailing zeros beyond the minor unit carry no value ("1.500").
        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > MINOR_DIGITS as usize {
            return Err(MoneyParseError::TooPrecise(s.to_string()));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| MoneyParseError::Overflow(s.to_string()))?
        };

        let mut fraction_value: i64 = 0;
        for (idx, digit) in fraction.chars().enumerate() {
            let digit = digit.to_digit(10).unwrap_or(0) as i64;
            fraction_value += digit * 10i64.pow(MINOR_DIGITS - 1 - idx as u32);
        }

        let minor = whole_value
            .checked_mul(MINOR_FACTOR)
            .and_then(|v| v.checked_add(fraction_value))
            .ok_or_else(|| MoneyParseError::Overflow(s.to_string()))?;

        Ok(Money(if negative { -minor } else { minor }))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let factor = MINOR_FACTOR as u64;
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            magnitude / factor,
            magnitude % factor,
            width = MINOR_DIGITS as usize
        )
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAmount {
            Text(String),
            Integer(i64),
            Float(f64),
        }

        match RawAmount::deserialize(deserializer)? {
            RawAmount::Text(text) => text.parse().map_err(de::Error::custom),
            RawAmount::Integer(whole) => whole
                .checked_mul(MINOR_FACTOR)
                .map(Money)
                .ok_or_else(|| de::Error::custom(format!("amount out of range: {}", whole))),
            RawAmount::Float(value) if value.is_finite() => {
                value.to_string().parse().map_err(de::Error::custom)
            }
            RawAmount::Float(value) => Err(de::Error::custom(format!("invalid amount: {}", value))),
        }
    }
}
