//! Stock record model
//!
//! A stock record is one partner's offer for a product: the partner's SKU,
//! a price and the stock it holds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Money;

/// Stock record entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockRecord {
    /// Unique identifier
    pub id: i64,
    /// Product this record offers
    pub product_id: i64,
    /// Fulfilment partner name
    pub partner: String,
    /// Partner's SKU, unique per partner
    pub partner_sku: String,
    /// ISO currency code of `price`
    pub price_currency: String,
    /// Price excluding tax; None when the partner has not priced it
    pub price: Option<Money>,
    /// Units held by the partner; None when stock is not tracked
    pub num_in_stock: Option<i64>,
    /// Units reserved by orders not yet shipped
    pub num_allocated: Option<i64>,
    /// Level at which the partner should restock
    pub low_stock_threshold: Option<i64>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl StockRecord {
    /// Units available to sell. Missing counts are treated as zero.
    pub fn net_stock_level(&self) -> i64 {
        self.num_in_stock.unwrap_or(0) - self.num_allocated.unwrap_or(0)
    }

    /// Whether stock has fallen to or below the restock threshold
    pub fn is_below_threshold(&self) -> bool {
        match self.low_stock_threshold {
            Some(threshold) => self.net_stock_level() <= threshold,
            None => false,
        }
    }
}

/// Input for creating a stock record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStockRecordInput {
    pub product_id: i64,
    pub partner: String,
    pub partner_sku: String,
    /// Defaults to the configured currency
    #[serde(default)]
    pub price_currency: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub num_in_stock: Option<i64>,
    #[serde(default)]
    pub num_allocated: Option<i64>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
}

impl CreateStockRecordInput {
    pub fn new(product_id: i64, partner: impl Into<String>, partner_sku: impl Into<String>) -> Self {
        Self {
            product_id,
            partner: partner.into(),
            partner_sku: partner_sku.into(),
            price_currency: None,
            price: None,
            num_in_stock: None,
            num_allocated: None,
            low_stock_threshold: None,
        }
    }

    pub fn with_price(mut self, price: Money) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.price_currency = Some(currency.into());
        self
    }

    pub fn with_stock(mut self, num_in_stock: i64, num_allocated: i64) -> Self {
        self.num_in_stock = Some(num_in_stock);
        self.num_allocated = Some(num_allocated);
        self
    }
}

/// Input for updating a stock record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStockRecordInput {
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub partner: Option<String>,
    #[serde(default)]
    pub partner_sku: Option<String>,
    #[serde(default)]
    pub price_currency: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub price: Option<Option<Money>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub num_in_stock: Option<Option<i64>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub num_allocated: Option<Option<i64>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub low_stock_threshold: Option<Option<i64>>,
}
