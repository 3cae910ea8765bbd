//! Pricing strategies
//!
//! A strategy turns a product and its stock records into a `PurchaseInfo`.
//! It never touches the database; callers load the records first.

use serde::Serialize;

use super::{Availability, Price, TaxPolicy};
use crate::models::{Product, StockRecord};

/// What a strategy decided for one product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseInfo {
    pub price: Price,
    pub availability: Availability,
    /// The stock record the decision was based on
    pub stockrecord: Option<StockRecord>,
}

impl PurchaseInfo {
    pub fn unavailable() -> Self {
        Self {
            price: Price::Unavailable,
            availability: Availability::Unavailable,
            stockrecord: None,
        }
    }
}

/// A child product together with its stock records
#[derive(Debug, Clone)]
pub struct ChildStock {
    pub product: Product,
    pub stockrecords: Vec<StockRecord>,
}

/// Price and availability rules
pub trait Strategy: Send + Sync {
    /// Purchase info for a standalone or child product.
    ///
    /// Parent products are delegated to `fetch_for_parent` with no children,
    /// so callers that have the children loaded should call that directly.
    fn fetch_for_product(&self, product: &Product, stockrecords: &[StockRecord]) -> PurchaseInfo;

    /// Purchase info for a parent product, computed from its children
    fn fetch_for_parent(&self, product: &Product, children: &[ChildStock]) -> PurchaseInfo;
}

/// The default strategy: first stock record, configured tax, and optional
/// stock tracking.
#[derive(Debug, Clone)]
pub struct StructuredStrategy {
    tax: TaxPolicy,
    stock_required: bool,
}

impl StructuredStrategy {
    pub fn new(tax: TaxPolicy, stock_required: bool) -> Self {
        Self { tax, stock_required }
    }

    pub fn tax_policy(&self) -> TaxPolicy {
        self.tax
    }

    pub fn stock_required(&self) -> bool {
        self.stock_required
    }

    /// Records are ordered by id, so the first one is the oldest.
    fn select_stockrecord<'a>(&self, stockrecords: &'a [StockRecord]) -> Option<&'a StockRecord> {
        stockrecords.iter().min_by_key(|record| record.id)
    }

    fn pricing_policy(&self, stockrecord: Option<&StockRecord>) -> Price {
        match stockrecord.and_then(|record| record.price.map(|price| (record, price))) {
            Some((record, excl_tax)) => Price::fixed(
                record.price_currency.clone(),
                excl_tax,
                Some(self.tax.tax_for(excl_tax)),
            ),
            None => Price::Unavailable,
        }
    }

    fn availability_policy(&self, stockrecord: Option<&StockRecord>) -> Availability {
        match stockrecord {
            None => Availability::Unavailable,
            Some(_) if !self.stock_required => Availability::Available,
            Some(record) => Availability::StockRequired {
                num_available: record.net_stock_level(),
            },
        }
    }
}

impl Strategy for StructuredStrategy {
    fn fetch_for_product(&self, product: &Product, stockrecords: &[StockRecord]) -> PurchaseInfo {
        if product.is_parent() {
            return self.fetch_for_parent(product, &[]);
        }

        let stockrecord = self.select_stockrecord(stockrecords);
        PurchaseInfo {
            price: self.pricing_policy(stockrecord),
            availability: self.availability_policy(stockrecord),
            stockrecord: stockrecord.cloned(),
        }
    }

    fn fetch_for_parent(&self, _product: &Product, children: &[ChildStock]) -> PurchaseInfo {
        // Price comes from the first child that is stocked at all, even when
        // that record carries no price.
        let price = children
            .iter()
            .find_map(|child| self.select_stockrecord(&child.stockrecords))
            .map(|record| self.pricing_policy(Some(record)))
            .unwrap_or(Price::Unavailable);

        let any_available = children.iter().any(|child| {
            self.availability_policy(self.select_stockrecord(&child.stockrecords))
                .is_available_to_buy()
        });

        PurchaseInfo {
            price,
            availability: if any_available {
                Availability::Available
            } else {
                Availability::Unavailable
            },
            stockrecord: None,
        }
    }
}
