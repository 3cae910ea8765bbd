//! Availability results

use serde::{Serialize, Serializer};

/// Whether, and how much of, a product can be bought
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Nothing to sell: no stock record, or every child is unavailable
    Unavailable,
    /// Stock is not tracked, so any quantity can be bought
    Available,
    /// Stock is tracked; `num_available` is the net stock level
    StockRequired { num_available: i64 },
}

impl Availability {
    pub fn is_available_to_buy(&self) -> bool {
        match self {
            Availability::Unavailable => false,
            Availability::Available => true,
            Availability::StockRequired { num_available } => *num_available > 0,
        }
    }

    pub fn num_available(&self) -> Option<i64> {
        match self {
            Availability::StockRequired { num_available } => Some(*num_available),
            _ => None,
        }
    }

    /// Short machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Availability::Unavailable => "unavailable",
            Availability::Available => "available",
            Availability::StockRequired { num_available } if *num_available > 0 => "instock",
            Availability::StockRequired { .. } => "outofstock",
        }
    }

    /// Customer-facing message
    pub fn message(&self) -> String {
        match self {
            Availability::Available => "Available".to_string(),
            Availability::StockRequired { num_available } if *num_available > 0 => {
                format!("In stock ({} available)", num_available)
            }
            _ => "Unavailable".to_string(),
        }
    }
}

#[derive(Serialize)]
struct AvailabilityRepr {
    is_available_to_buy: bool,
    num_available: Option<i64>,
    message: String,
    code: &'static str,
}

impl Serialize for Availability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        AvailabilityRepr {
            is_available_to_buy: self.is_available_to_buy(),
            num_available: self.num_available(),
            message: self.message(),
            code: self.code(),
        }
        .serialize(serializer)
    }
}
