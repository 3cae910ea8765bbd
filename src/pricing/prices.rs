//! Price results and tax policies

use serde::{Serialize, Serializer};
use std::str::FromStr;

use crate::models::Money;

/// Largest number of decimal places accepted in a tax rate
const MAX_RATE_DIGITS: u32 = 6;

/// How tax is applied to a stock record's price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxPolicy {
    /// Prices carry no tax; tax is known and zero
    NoTax,
    /// Tax is `excl_tax * numerator / denominator`
    FixedRate { numerator: i64, denominator: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaxRateError {
    #[error("tax rate is empty")]
    Empty,
    #[error("invalid tax rate: {0}")]
    Invalid(String),
    #[error("tax rate cannot be negative: {0}")]
    Negative(String),
    #[error("tax rate has more than six decimal places: {0}")]
    TooPrecise(String),
}

impl TaxPolicy {
    /// Tax owed on an amount excluding tax
    pub fn tax_for(&self, excl_tax: Money) -> Money {
        match self {
            TaxPolicy::NoTax => Money::ZERO,
            TaxPolicy::FixedRate {
                numerator,
                denominator,
            } => excl_tax.mul_ratio_half_even(*numerator, *denominator),
        }
    }
}

impl FromStr for TaxPolicy {
    type Err = TaxRateError;

    /// Parse a decimal rate such as `"0.2"` (20%). A zero rate is `NoTax`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TaxRateError::Empty);
        }
        if trimmed.starts_with('-') {
            return Err(TaxRateError::Negative(s.to_string()));
        }

        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if (whole.is_empty() && fraction.is_empty())
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(TaxRateError::Invalid(s.to_string()));
        }

        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > MAX_RATE_DIGITS as usize {
            return Err(TaxRateError::TooPrecise(s.to_string()));
        }

        let denominator = 10i64.pow(fraction.len() as u32);
        let digits = format!("{}{}", whole, fraction);
        let numerator: i64 = if digits.is_empty() {
            0
        } else {
            digits
                .parse()
                .map_err(|_| TaxRateError::Invalid(s.to_string()))?
        };

        if numerator == 0 {
            Ok(TaxPolicy::NoTax)
        } else {
            Ok(TaxPolicy::FixedRate {
                numerator,
                denominator,
            })
        }
    }
}

/// The price a strategy quotes for a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Price {
    /// No price can be quoted (no stock record, or the record has no price)
    Unavailable,
    /// A fixed price in one currency
    Fixed {
        currency: String,
        excl_tax: Money,
        /// `None` when the tax cannot be determined yet
        tax: Option<Money>,
    },
}

impl Price {
    pub fn fixed(currency: impl Into<String>, excl_tax: Money, tax: Option<Money>) -> Self {
        Price::Fixed {
            currency: currency.into(),
            excl_tax,
            tax,
        }
    }

    pub fn exists(&self) -> bool {
        matches!(self, Price::Fixed { .. })
    }

    pub fn is_tax_known(&self) -> bool {
        matches!(self, Price::Fixed { tax: Some(_), .. })
    }

    pub fn currency(&self) -> Option<&str> {
        match self {
            Price::Fixed { currency, .. } => Some(currency),
            Price::Unavailable => None,
        }
    }

    pub fn excl_tax(&self) -> Option<Money> {
        match self {
            Price::Fixed { excl_tax, .. } => Some(*excl_tax),
            Price::Unavailable => None,
        }
    }

    pub fn tax(&self) -> Option<Money> {
        match self {
            Price::Fixed { tax, .. } => *tax,
            Price::Unavailable => None,
        }
    }

    /// Price including tax, known only when the tax is
    pub fn incl_tax(&self) -> Option<Money> {
        match self {
            Price::Fixed {
                excl_tax,
                tax: Some(tax),
                ..
            } => excl_tax.checked_add(*tax),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct PriceRepr<'a> {
    currency: Option<&'a str>,
    excl_tax: Option<Money>,
    incl_tax: Option<Money>,
    tax: Option<Money>,
    is_tax_known: bool,
    exists: bool,
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PriceRepr {
            currency: self.currency(),
            excl_tax: self.excl_tax(),
            incl_tax: self.incl_tax(),
            tax: self.tax(),
            is_tax_known: self.is_tax_known(),
            exists: self.exists(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_tax_rate() {
        assert_eq!("0".parse::<TaxPolicy>().unwrap(), TaxPolicy::NoTax);
        assert_eq!("0.000".parse::<TaxPolicy>().unwrap(), TaxPolicy::NoTax);
        assert_eq!(
            "0.2".parse::<TaxPolicy>().unwrap(),
            TaxPolicy::FixedRate {
                numerator: 2,
                denominator: 10
            }
        );
        assert_eq!(
            "0.175".parse::<TaxPolicy>().unwrap(),
            TaxPolicy::FixedRate {
                numerator: 175,
                denominator: 1000
            }
        );
        assert_eq!(
            "1".parse::<TaxPolicy>().unwrap(),
            TaxPolicy::FixedRate {
                numerator: 1,
                denominator: 1
            }
        );
    }

    #[test]
    fn test_parse_tax_rate_errors() {
        assert_eq!("".parse::<TaxPolicy>(), Err(TaxRateError::Empty));
        assert!(matches!("-0.1".parse::<TaxPolicy>(), Err(TaxRateError::Negative(_))));
        assert!(matches!("abc".parse::<TaxPolicy>(), Err(TaxRateError::Invalid(_))));
        assert!(matches!(".".parse::<TaxPolicy>(), Err(TaxRateError::Invalid(_))));
        assert!(matches!(
            "0.1234567".parse::<TaxPolicy>(),
            Err(TaxRateError::TooPrecise(_))
        ));
    }

    #[test]
    fn test_fixed_rate_rounds_half_even() {
        let vat = "0.5".parse::<TaxPolicy>().unwrap();
        // 0.05 * 0.5 = 0.025 -> 0.02
        assert_eq!(vat.tax_for(Money::from_minor(5)), Money::from_minor(2));
        // 0.15 * 0.5 = 0.075 -> 0.08
        assert_eq!(vat.tax_for(Money::from_minor(15)), Money::from_minor(8));

        let vat = "0.2".parse::<TaxPolicy>().unwrap();
        assert_eq!(vat.tax_for(Money::from_minor(1299)), Money::from_minor(260));
    }

    #[test]
    fn test_price_serialization() {
        let price = Price::fixed("GBP", Money::from_minor(1000), Some(Money::from_minor(200)));
        let json = serde_json::to_value(&price).unwrap();
        assert_eq!(json["currency"], "GBP");
        assert_eq!(json["excl_tax"], "10.00");
        assert_eq!(json["incl_tax"], "12.00");
        assert_eq!(json["tax"], "2.00");
        assert_eq!(json["is_tax_known"], true);
        assert_eq!(json["exists"], true);

        let json = serde_json::to_value(&Price::Unavailable).unwrap();
        assert!(json["currency"].is_null());
        assert!(json["excl_tax"].is_null());
        assert!(json["incl_tax"].is_null());
        assert_eq!(json["is_tax_known"], false);
        assert_eq!(json["exists"], false);
    }

    #[test]
    fn test_unknown_tax_has_no_incl_tax() {
        let price = Price::fixed("EUR", Money::from_minor(500), None);
        assert!(price.exists());
        assert!(!price.is_tax_known());
        assert_eq!(price.incl_tax(), None);
    }

    proptest! {
        #[test]
        fn no_tax_is_always_zero(minor in 0i64..10_000_000) {
            prop_assert_eq!(TaxPolicy::NoTax.tax_for(Money::from_minor(minor)), Money::ZERO);
        }

        #[test]
        fn fixed_rate_tax_never_exceeds_amount_at_unit_rate(minor in 0i64..10_000_000) {
            let policy = "1".parse::<TaxPolicy>().unwrap();
            prop_assert_eq!(policy.tax_for(Money::from_minor(minor)), Money::from_minor(minor));
        }
    }
}
