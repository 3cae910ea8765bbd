//! Pricing
//!
//! Price and availability are computed by a `Strategy`. A `Selector` picks
//! the strategy for each request, so pricing can vary per customer without
//! the handlers knowing.
//!
//! # Usage
//!
//! ```ignore
//! use catalogue_api::pricing::{DefaultSelector, RequestContext, Selector};
//!
//! let selector = DefaultSelector::from_config(&config.pricing)?;
//! let strategy = selector.strategy(&RequestContext::anonymous());
//! let info = strategy.fetch_for_product(&product, &stockrecords);
//! ```

pub mod availability;
pub mod prices;
pub mod strategy;

use std::sync::Arc;

use crate::config::PricingConfig;

pub use availability::Availability;
pub use prices::{Price, TaxPolicy, TaxRateError};
pub use strategy::{ChildStock, PurchaseInfo, Strategy, StructuredStrategy};

/// Request details a selector may use to choose a strategy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Identifies the customer, from the `X-Customer-Id` header
    pub customer_id: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
        }
    }
}

/// Chooses the strategy for a request
pub trait Selector: Send + Sync {
    fn strategy(&self, ctx: &RequestContext) -> Arc<dyn Strategy>;
}

/// Hands every request the same configured `StructuredStrategy`
pub struct DefaultSelector {
    strategy: Arc<StructuredStrategy>,
}

impl DefaultSelector {
    pub fn new(strategy: StructuredStrategy) -> Self {
        Self {
            strategy: Arc::new(strategy),
        }
    }

    pub fn from_config(config: &PricingConfig) -> Result<Self, TaxRateError> {
        let tax: TaxPolicy = config.tax_rate.parse()?;
        Ok(Self::new(StructuredStrategy::new(tax, config.stock_required)))
    }

    /// Wrap in an Arc as a trait object
    pub fn boxed(self) -> Arc<dyn Selector> {
        Arc::new(self)
    }
}

impl Selector for DefaultSelector {
    fn strategy(&self, ctx: &RequestContext) -> Arc<dyn Strategy> {
        tracing::debug!(customer = ?ctx.customer_id, "Selecting default pricing strategy");
        self.strategy.clone()
    }
}
