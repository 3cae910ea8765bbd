//! Stock record repository
//!
//! Prices are persisted as integer minor units in the `price` column.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Money, StockRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Stock record repository trait
#[async_trait]
pub trait StockRecordRepository: Send + Sync {
    async fn create(&self, record: &StockRecord) -> Result<StockRecord>;

    async fn get_by_id(&self, id: i64) -> Result<Option<StockRecord>>;

    /// Find a record by partner and SKU
    async fn get_by_partner_sku(&self, partner: &str, partner_sku: &str)
        -> Result<Option<StockRecord>>;

    /// List all stock records in id order
    async fn list(&self) -> Result<Vec<StockRecord>>;

    /// Stock records of one product, lowest id first
    async fn list_for_product(&self, product_id: i64) -> Result<Vec<StockRecord>>;

    async fn update(&self, record: &StockRecord) -> Result<StockRecord>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based stock record repository implementation
pub struct SqlxStockRecordRepository {
    pool: DynDatabasePool,
}

impl SqlxStockRecordRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn StockRecordRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl StockRecordRepository for SqlxStockRecordRepository {
    async fn create(&self, record: &StockRecord) -> Result<StockRecord> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_stock_record_sqlite(self.pool.as_sqlite().unwrap(), record).await
            }
            DatabaseDriver::Mysql => {
                create_stock_record_mysql(self.pool.as_mysql().unwrap(), record).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<StockRecord>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_stock_record_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_stock_record_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_by_partner_sku(
        &self,
        partner: &str,
        partner_sku: &str,
    ) -> Result<Option<StockRecord>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_partner_sku_sqlite(self.pool.as_sqlite().unwrap(), partner, partner_sku)
                    .await
            }
            DatabaseDriver::Mysql => {
                get_by_partner_sku_mysql(self.pool.as_mysql().unwrap(), partner, partner_sku).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<StockRecord>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_stock_records_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_stock_records_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_for_product(&self, product_id: i64) -> Result<Vec<StockRecord>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_for_product_sqlite(self.pool.as_sqlite().unwrap(), product_id).await
            }
            DatabaseDriver::Mysql => {
                list_for_product_mysql(self.pool.as_mysql().unwrap(), product_id).await
            }
        }
    }

    async fn update(&self, record: &StockRecord) -> Result<StockRecord> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_stock_record_sqlite(self.pool.as_sqlite().unwrap(), record).await
            }
            DatabaseDriver::Mysql => {
                update_stock_record_mysql(self.pool.as_mysql().unwrap(), record).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_stock_record_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                delete_stock_record_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }
}

const STOCK_RECORD_COLUMNS: &str = "id, product_id, partner, partner_sku, price_currency, price, num_in_stock, num_allocated, low_stock_threshold, date_created, date_updated";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_stock_record_sqlite(pool: &SqlitePool, record: &StockRecord) -> Result<StockRecord> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO stock_records (product_id, partner, partner_sku, price_currency, price,
            num_in_stock, num_allocated, low_stock_threshold, date_created, date_updated)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.product_id)
    .bind(&record.partner)
    .bind(&record.partner_sku)
    .bind(&record.price_currency)
    .bind(record.price.map(|p| p.minor_units()))
    .bind(record.num_in_stock)
    .bind(record.num_allocated)
    .bind(record.low_stock_threshold)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create stock record")?;

    Ok(StockRecord {
        id: result.last_insert_rowid(),
        date_created: now,
        date_updated: now,
        ..record.clone()
    })
}

async fn get_stock_record_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<StockRecord>> {
    let sql = format!("SELECT {} FROM stock_records WHERE id = ?", STOCK_RECORD_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get stock record by ID")?;

    row.as_ref().map(row_to_stock_record_sqlite).transpose()
}

async fn get_by_partner_sku_sqlite(
    pool: &SqlitePool,
    partner: &str,
    partner_sku: &str,
) -> Result<Option<StockRecord>> {
    let sql = format!(
        "SELECT {} FROM stock_records WHERE partner = ? AND partner_sku = ?",
        STOCK_RECORD_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(partner)
        .bind(partner_sku)
        .fetch_optional(pool)
        .await
        .context("Failed to get stock record by partner SKU")?;

    row.as_ref().map(row_to_stock_record_sqlite).transpose()
}

async fn list_stock_records_sqlite(pool: &SqlitePool) -> Result<Vec<StockRecord>> {
    let sql = format!("SELECT {} FROM stock_records ORDER BY id", STOCK_RECORD_COLUMNS);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list stock records")?;

    rows.iter().map(row_to_stock_record_sqlite).collect()
}

async fn list_for_product_sqlite(pool: &SqlitePool, product_id: i64) -> Result<Vec<StockRecord>> {
    let sql = format!(
        "SELECT {} FROM stock_records WHERE product_id = ? ORDER BY id",
        STOCK_RECORD_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(product_id)
        .fetch_all(pool)
        .await
        .context("Failed to list stock records for product")?;

    rows.iter().map(row_to_stock_record_sqlite).collect()
}

async fn update_stock_record_sqlite(pool: &SqlitePool, record: &StockRecord) -> Result<StockRecord> {
    sqlx::query(
        r#"
        UPDATE stock_records
        SET product_id = ?, partner = ?, partner_sku = ?, price_currency = ?, price = ?,
            num_in_stock = ?, num_allocated = ?, low_stock_threshold = ?, date_updated = ?
        WHERE id = ?
        "#,
    )
    .bind(record.product_id)
    .bind(&record.partner)
    .bind(&record.partner_sku)
    .bind(&record.price_currency)
    .bind(record.price.map(|p| p.minor_units()))
    .bind(record.num_in_stock)
    .bind(record.num_allocated)
    .bind(record.low_stock_threshold)
    .bind(Utc::now())
    .bind(record.id)
    .execute(pool)
    .await
    .context("Failed to update stock record")?;

    get_stock_record_by_id_sqlite(pool, record.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Stock record not found after update"))
}

async fn delete_stock_record_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM stock_records WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete stock record")?;

    Ok(())
}

fn row_to_stock_record_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<StockRecord> {
    let price: Option<i64> = row.get("price");
    Ok(StockRecord {
        id: row.get("id"),
        product_id: row.get("product_id"),
        partner: row.get("partner"),
        partner_sku: row.get("partner_sku"),
        price_currency: row.get("price_currency"),
        price: price.map(Money::from_minor),
        num_in_stock: row.get("num_in_stock"),
        num_allocated: row.get("num_allocated"),
        low_stock_threshold: row.get("low_stock_threshold"),
        date_created: row.get("date_created"),
        date_updated: row.get("date_updated"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_stock_record_mysql(pool: &MySqlPool, record: &StockRecord) -> Result<StockRecord> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO stock_records (product_id, partner, partner_sku, price_currency, price,
            num_in_stock, num_allocated, low_stock_threshold, date_created, date_updated)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.product_id)
    .bind(&record.partner)
    .bind(&record.partner_sku)
    .bind(&record.price_currency)
    .bind(record.price.map(|p| p.minor_units()))
    .bind(record.num_in_stock)
    .bind(record.num_allocated)
    .bind(record.low_stock_threshold)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create stock record")?;

    Ok(StockRecord {
        id: result.last_insert_id() as i64,
        date_created: now,
        date_updated: now,
        ..record.clone()
    })
}

async fn get_stock_record_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<StockRecord>> {
    let sql = format!("SELECT {} FROM stock_records WHERE id = ?", STOCK_RECORD_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get stock record by ID")?;

    row.as_ref().map(row_to_stock_record_mysql).transpose()
}

async fn get_by_partner_sku_mysql(
    pool: &MySqlPool,
    partner: &str,
    partner_sku: &str,
) -> Result<Option<StockRecord>> {
    let sql = format!(
        "SELECT {} FROM stock_records WHERE partner = ? AND partner_sku = ?",
        STOCK_RECORD_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(partner)
        .bind(partner_sku)
        .fetch_optional(pool)
        .await
        .context("Failed to get stock record by partner SKU")?;

    row.as_ref().map(row_to_stock_record_mysql).transpose()
}

async fn list_stock_records_mysql(pool: &MySqlPool) -> Result<Vec<StockRecord>> {
    let sql = format!("SELECT {} FROM stock_records ORDER BY id", STOCK_RECORD_COLUMNS);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list stock records")?;

    rows.iter().map(row_to_stock_record_mysql).collect()
}

async fn list_for_product_mysql(pool: &MySqlPool, product_id: i64) -> Result<Vec<StockRecord>> {
    let sql = format!(
        "SELECT {} FROM stock_records WHERE product_id = ? ORDER BY id",
        STOCK_RECORD_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(product_id)
        .fetch_all(pool)
        .await
        .context("Failed to list stock records for product")?;

    rows.iter().map(row_to_stock_record_mysql).collect()
}

async fn update_stock_record_mysql(pool: &MySqlPool, record: &StockRecord) -> Result<StockRecord> {
    sqlx::query(
        r#"
        UPDATE stock_records
        SET product_id = ?, partner = ?, partner_sku = ?, price_currency = ?, price = ?,
            num_in_stock = ?, num_allocated = ?, low_stock_threshold = ?, date_updated = ?
        WHERE id = ?
        "#,
    )
    .bind(record.product_id)
    .bind(&record.partner)
    .bind(&record.partner_sku)
    .bind(&record.price_currency)
    .bind(record.price.map(|p| p.minor_units()))
    .bind(record.num_in_stock)
    .bind(record.num_allocated)
    .bind(record.low_stock_threshold)
    .bind(Utc::now())
    .bind(record.id)
    .execute(pool)
    .await
    .context("Failed to update stock record")?;

    get_stock_record_by_id_mysql(pool, record.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Stock record not found after update"))
}

async fn delete_stock_record_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM stock_records WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete stock record")?;

    Ok(())
}

fn row_to_stock_record_mysql(row: &sqlx::mysql::MySqlRow) -> Result<StockRecord> {
    let price: Option<i64> = row.get("price");
    Ok(StockRecord {
        id: row.get("id"),
        product_id: row.get("product_id"),
        partner: row.get("partner"),
        partner_sku: row.get("partner_sku"),
        price_currency: row.get("price_currency"),
        price: price.map(Money::from_minor),
        num_in_stock: row.get("num_in_stock"),
        num_allocated: row.get("num_allocated"),
        low_stock_threshold: row.get("low_stock_threshold"),
        date_created: row.get("date_created"),
        date_updated: row.get("date_updated"),
    })
}
