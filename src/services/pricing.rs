//! Pricing service
//!
//! Loads what a strategy needs (the product, its stock records and, for a
//! parent, each child's stock records) and asks the request's strategy for
//! a `PurchaseInfo`.

use crate::db::repositories::{ProductRepository, StockRecordRepository};
use crate::models::Product;
use crate::pricing::{ChildStock, PurchaseInfo, RequestContext, Selector};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PricingServiceError {
    #[error("Product not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Computes price and availability for products
pub struct PricingService {
    product_repo: Arc<dyn ProductRepository>,
    stock_repo: Arc<dyn StockRecordRepository>,
    selector: Arc<dyn Selector>,
}

impl PricingService {
    pub fn new(
        product_repo: Arc<dyn ProductRepository>,
        stock_repo: Arc<dyn StockRecordRepository>,
        selector: Arc<dyn Selector>,
    ) -> Self {
        Self {
            product_repo,
            stock_repo,
            selector,
        }
    }

    /// Purchase info for a product under the strategy chosen for `ctx`
    pub async fn fetch(&self, product_id: i64, ctx: &RequestContext) -> Result<PurchaseInfo, PricingServiceError> {
        let product = self
            .product_repo
            .get_by_id(product_id)
            .await
            .context("Failed to get product")?
            .ok_or_else(|| PricingServiceError::NotFound(format!("Product with ID {} not found", product_id)))?;

        let strategy = self.selector.strategy(ctx);

        if product.is_parent() {
            let children = self.load_children(&product).await?;
            return Ok(strategy.fetch_for_parent(&product, &children));
        }

        let stockrecords = self
            .stock_repo
            .list_for_product(product.id)
            .await
            .context("Failed to get stock records")?;
        Ok(strategy.fetch_for_product(&product, &stockrecords))
    }

    async fn load_children(&self, parent: &Product) -> Result<Vec<ChildStock>, PricingServiceError> {
        let children = self
            .product_repo
            .list_children(parent.id)
            .await
            .context("Failed to list child products")?;

        let mut stocked = Vec::with_capacity(children.len());
        for child in children {
            let stockrecords = self
                .stock_repo
                .list_for_product(child.id)
                .await
                .context("Failed to get child stock records")?;
            stocked.push(ChildStock {
                product: child,
                stockrecords,
            });
        }
        Ok(stocked)
    }
}
