//! Stock record service
//!
//! Stock records tie a product to a partner's SKU, price and stock counts.
//! Parent products are never stocked directly.

use crate::db::is_unique_violation;
use crate::db::repositories::{ProductRepository, StockRecordRepository};
use crate::models::{CreateStockRecordInput, Money, StockRecord, UpdateStockRecordInput};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Error types for stock record operations
#[derive(Debug, thiserror::Error)]
pub enum StockRecordServiceError {
    #[error("Stock record not found: {0}")]
    NotFound(String),

    /// The partner already has a record with this SKU
    #[error("Partner '{partner}' already has SKU '{partner_sku}'")]
    DuplicateSku { partner: String, partner_sku: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Stock record service
pub struct StockRecordService {
    repo: Arc<dyn StockRecordRepository>,
    product_repo: Arc<dyn ProductRepository>,
    default_currency: String,
}

impl StockRecordService {
    pub fn new(
        repo: Arc<dyn StockRecordRepository>,
        product_repo: Arc<dyn ProductRepository>,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            product_repo,
            default_currency: default_currency.into(),
        }
    }

    /// Create a stock record
    ///
    /// # Errors
    /// - `ValidationError` if the product is missing or a parent, or a field is invalid
    /// - `DuplicateSku` if the partner already uses the SKU
    pub async fn create(&self, input: CreateStockRecordInput) -> Result<StockRecord, StockRecordServiceError> {
        let now = Utc::now();
        let record = StockRecord {
            id: 0,
            product_id: input.product_id,
            partner: input.partner.trim().to_string(),
            partner_sku: input.partner_sku.trim().to_string(),
            price_currency: match input.price_currency {
                Some(currency) => normalize_currency(&currency)?,
                None => self.default_currency.clone(),
            },
            price: input.price,
            num_in_stock: input.num_in_stock,
            num_allocated: input.num_allocated,
            low_stock_threshold: input.low_stock_threshold,
            date_created: now,
            date_updated: now,
        };

        validate_record(&record)?;
        self.check_product(record.product_id).await?;
        self.check_sku(&record.partner, &record.partner_sku, None).await?;

        let created = self
            .repo
            .create(&record)
            .await
            .map_err(|e| sku_conflict(e, &record, "Failed to create stock record"))?;
        tracing::info!(
            id = created.id,
            product_id = created.product_id,
            partner = %created.partner,
            "Created stock record"
        );

        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<StockRecord>, StockRecordServiceError> {
        self.repo.get_by_id(id).await.context("Failed to get stock record").map_err(Into::into)
    }

    /// A stock record, only if it belongs to `product_id`
    pub async fn get_for_product(
        &self,
        product_id: i64,
        id: i64,
    ) -> Result<Option<StockRecord>, StockRecordServiceError> {
        Ok(self.get_by_id(id).await?.filter(|record| record.product_id == product_id))
    }

    pub async fn list(&self) -> Result<Vec<StockRecord>, StockRecordServiceError> {
        self.repo.list().await.context("Failed to list stock records").map_err(Into::into)
    }

    /// Stock records of a product; empty for an unknown product
    pub async fn list_for_product(&self, product_id: i64) -> Result<Vec<StockRecord>, StockRecordServiceError> {
        self.repo
            .list_for_product(product_id)
            .await
            .context("Failed to list product stock records")
            .map_err(Into::into)
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateStockRecordInput,
    ) -> Result<StockRecord, StockRecordServiceError> {
        let mut record = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get stock record")?
            .ok_or_else(|| StockRecordServiceError::NotFound(format!("Stock record with ID {} not found", id)))?;

        if let Some(product_id) = input.product_id {
            if product_id != record.product_id {
                self.check_product(product_id).await?;
                record.product_id = product_id;
            }
        }
        if let Some(partner) = input.partner {
            record.partner = partner.trim().to_string();
        }
        if let Some(partner_sku) = input.partner_sku {
            record.partner_sku = partner_sku.trim().to_string();
        }
        if let Some(currency) = input.price_currency {
            record.price_currency = normalize_currency(&currency)?;
        }
        if let Some(price) = input.price {
            record.price = price;
        }
        if let Some(num_in_stock) = input.num_in_stock {
            record.num_in_stock = num_in_stock;
        }
        if let Some(num_allocated) = input.num_allocated {
            record.num_allocated = num_allocated;
        }
        if let Some(threshold) = input.low_stock_threshold {
            record.low_stock_threshold = threshold;
        }

        validate_record(&record)?;
        self.check_sku(&record.partner, &record.partner_sku, Some(id)).await?;

        let updated = self
            .repo
            .update(&record)
            .await
            .map_err(|e| sku_conflict(e, &record, "Failed to update stock record"))?;
        if updated.is_below_threshold() {
            tracing::warn!(
                id,
                net_stock = updated.net_stock_level(),
                "Stock record is at or below its low stock threshold"
            );
        }
        tracing::info!(id, "Updated stock record");

        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), StockRecordServiceError> {
        if self.repo.get_by_id(id).await.context("Failed to get stock record")?.is_none() {
            return Err(StockRecordServiceError::NotFound(format!(
                "Stock record with ID {} not found",
                id
            )));
        }
        self.repo.delete(id).await.context("Failed to delete stock record")?;
        tracing::info!(id, "Deleted stock record");
        Ok(())
    }

    async fn check_product(&self, product_id: i64) -> Result<(), StockRecordServiceError> {
        let product = self
            .product_repo
            .get_by_id(product_id)
            .await
            .context("Failed to get product")?
            .ok_or_else(|| {
                StockRecordServiceError::ValidationError(format!("Product {} does not exist", product_id))
            })?;

        if !product.can_have_stockrecords() {
            return Err(StockRecordServiceError::ValidationError(format!(
                "Product {} is a parent product and can't have stock records",
                product_id
            )));
        }
        Ok(())
    }

    async fn check_sku(
        &self,
        partner: &str,
        partner_sku: &str,
        exclude_id: Option<i64>,
    ) -> Result<(), StockRecordServiceError> {
        let existing = self
            .repo
            .get_by_partner_sku(partner, partner_sku)
            .await
            .context("Failed to check SKU uniqueness")?;

        match existing {
            Some(other) if Some(other.id) != exclude_id => Err(StockRecordServiceError::DuplicateSku {
                partner: partner.to_string(),
                partner_sku: partner_sku.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// The (partner, SKU) UNIQUE constraint caught a concurrent writer
fn sku_conflict(
    err: anyhow::Error,
    record: &StockRecord,
    context: &'static str,
) -> StockRecordServiceError {
    if is_unique_violation(&err) {
        StockRecordServiceError::DuplicateSku {
            partner: record.partner.clone(),
            partner_sku: record.partner_sku.clone(),
        }
    } else {
        StockRecordServiceError::InternalError(err.context(context))
    }
}

/// Trim and uppercase a currency code, which must be three ASCII letters
pub fn normalize_currency(code: &str) -> Result<String, StockRecordServiceError> {
    let code = code.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(StockRecordServiceError::ValidationError(format!(
            "'{}' is not a three-letter currency code",
            code
        )));
    }
    Ok(code)
}

/// Field rules shared by create and update
fn validate_record(record: &StockRecord) -> Result<(), StockRecordServiceError> {
    if record.partner.is_empty() {
        return Err(StockRecordServiceError::ValidationError("Partner cannot be empty".to_string()));
    }
    if record.partner_sku.is_empty() {
        return Err(StockRecordServiceError::ValidationError(
            "Partner SKU cannot be empty".to_string(),
        ));
    }
    if record.price.map_or(false, |price| price < Money::ZERO) {
        return Err(StockRecordServiceError::ValidationError(
            "Price cannot be negative".to_string(),
        ));
    }
    for (field, count) in [
        ("num_in_stock", record.num_in_stock),
        ("num_allocated", record.num_allocated),
        ("low_stock_threshold", record.low_stock_threshold),
    ] {
        if count.map_or(false, |n| n < 0) {
            return Err(StockRecordServiceError::ValidationError(format!(
                "{} cannot be negative",
                field
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxProductRepository, SqlxStockRecordRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Product, ProductStructure};

    #[test]
    fn test_normalize_currency() {
        assert_eq!(normalize_currency(" eur ").unwrap(), "EUR");
        assert_eq!(normalize_currency("GBP").unwrap(), "GBP");
        for bad in ["", "pounds", "G1P", "€€€"] {
            assert!(
                matches!(normalize_currency(bad), Err(StockRecordServiceError::ValidationError(_))),
                "{:?}",
                bad
            );
        }
    }

    struct Fixture {
        service: StockRecordService,
        standalone: Product,
        parent: Product,
    }

    async fn setup_test_service() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let product_repo = SqlxProductRepository::boxed(pool.clone());
        let now = Utc::now();
        let template = Product {
            id: 0,
            structure: ProductStructure::Standalone,
            upc: None,
            parent_id: None,
            title: Some("Chair".to_string()),
            slug: "chair".to_string(),
            description: String::new(),
            is_public: true,
            date_created: now,
            date_updated: now,
        };
        let standalone = product_repo.create(&template, &[]).await.unwrap();
        let parent = product_repo
            .create(&Product {
                structure: ProductStructure::Parent,
                slug: "table".to_string(),
                ..template
            }, &[])
            .await
            .unwrap();

        Fixture {
            service: StockRecordService::new(
                SqlxStockRecordRepository::boxed(pool.clone()),
                product_repo,
                "GBP",
            ),
            standalone,
            parent,
        }
    }

    #[tokio::test]
    async fn test_create_uses_default_currency() {
        let f = setup_test_service().await;

        let record = f
            .service
            .create(
                CreateStockRecordInput::new(f.standalone.id, "acme", "CH-1")
                    .with_price(Money::from_minor(4999))
                    .with_stock(10, 2),
            )
            .await
            .unwrap();
        assert_eq!(record.price_currency, "GBP");
        assert_eq!(record.price, Some(Money::from_minor(4999)));
        assert_eq!(record.net_stock_level(), 8);

        let euro = f
            .service
            .create(CreateStockRecordInput::new(f.standalone.id, "acme", "CH-2").with_currency("eur"))
            .await
            .unwrap();
        assert_eq!(euro.price_currency, "EUR");
    }

    #[tokio::test]
    async fn test_parent_cannot_be_stocked() {
        let f = setup_test_service().await;
        let result = f
            .service
            .create(CreateStockRecordInput::new(f.parent.id, "acme", "T-1"))
            .await;
        assert!(matches!(result, Err(StockRecordServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_field_validation() {
        let f = setup_test_service().await;

        let negative_price = f
            .service
            .create(
                CreateStockRecordInput::new(f.standalone.id, "acme", "CH-1")
                    .with_price(Money::from_minor(-1)),
            )
            .await;
        assert!(matches!(negative_price, Err(StockRecordServiceError::ValidationError(_))));

        let negative_stock = f
            .service
            .create(CreateStockRecordInput::new(f.standalone.id, "acme", "CH-1").with_stock(-1, 0))
            .await;
        assert!(matches!(negative_stock, Err(StockRecordServiceError::ValidationError(_))));

        let bad_currency = f
            .service
            .create(CreateStockRecordInput::new(f.standalone.id, "acme", "CH-1").with_currency("POUNDS"))
            .await;
        assert!(matches!(bad_currency, Err(StockRecordServiceError::ValidationError(_))));

        let missing_product = f
            .service
            .create(CreateStockRecordInput::new(999, "acme", "CH-1"))
            .await;
        assert!(matches!(missing_product, Err(StockRecordServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_partner_sku_unique() {
        let f = setup_test_service().await;

        f.service
            .create(CreateStockRecordInput::new(f.standalone.id, "acme", "CH-1"))
            .await
            .unwrap();
        let duplicate = f
            .service
            .create(CreateStockRecordInput::new(f.standalone.id, "acme", "CH-1"))
            .await;
        assert!(matches!(duplicate, Err(StockRecordServiceError::DuplicateSku { .. })));

        // Another partner may reuse the SKU
        f.service
            .create(CreateStockRecordInput::new(f.standalone.id, "globex", "CH-1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_sku_is_conflict() {
        let f = setup_test_service().await;

        let (a, b) = tokio::join!(
            f.service.create(CreateStockRecordInput::new(f.standalone.id, "acme", "RACE")),
            f.service.create(CreateStockRecordInput::new(f.standalone.id, "acme", "RACE")),
        );
        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(StockRecordServiceError::DuplicateSku { .. }))));
    }

    #[tokio::test]
    async fn test_scoped_to_product() {
        let f = setup_test_service().await;
        let record = f
            .service
            .create(CreateStockRecordInput::new(f.standalone.id, "acme", "CH-1"))
            .await
            .unwrap();

        assert!(f.service.get_for_product(f.standalone.id, record.id).await.unwrap().is_some());
        assert!(f.service.get_for_product(f.parent.id, record.id).await.unwrap().is_none());

        assert_eq!(f.service.list_for_product(f.standalone.id).await.unwrap().len(), 1);
        assert!(f.service.list_for_product(12345).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_clears_price_and_deletes() {
        let f = setup_test_service().await;
        let record = f
            .service
            .create(
                CreateStockRecordInput::new(f.standalone.id, "acme", "CH-1")
                    .with_price(Money::from_minor(100)),
            )
            .await
            .unwrap();

        let updated = f
            .service
            .update(
                record.id,
                UpdateStockRecordInput {
                    price: Some(None),
                    num_in_stock: Some(Some(3)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, None);
        assert_eq!(updated.num_in_stock, Some(3));

        f.service.delete(record.id).await.unwrap();
        assert!(matches!(
            f.service.delete(record.id).await,
            Err(StockRecordServiceError::NotFound(_))
        ));
    }
}
