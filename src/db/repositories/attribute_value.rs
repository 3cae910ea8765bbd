//! Product attribute value repository
//!
//! Values are stored as serialized JSON in `value_json`.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ProductAttributeSummary, ProductAttributeValue};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Attribute value repository trait
#[async_trait]
pub trait AttributeValueRepository: Send + Sync {
    async fn create(&self, value: &ProductAttributeValue) -> Result<ProductAttributeValue>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ProductAttributeValue>>;

    /// The value a product holds for an attribute, if any
    async fn get_for(
        &self,
        product_id: i64,
        attribute_id: i64,
    ) -> Result<Option<ProductAttributeValue>>;

    /// List values, optionally only those of one product
    async fn list(&self, product_id: Option<i64>) -> Result<Vec<ProductAttributeValue>>;

    /// Whether any product holds a value for this attribute
    async fn exists_for_attribute(&self, attribute_id: i64) -> Result<bool>;

    /// Values of a product joined with their attribute's name and code
    async fn list_summaries(&self, product_id: i64) -> Result<Vec<ProductAttributeSummary>>;

    async fn update(&self, value: &ProductAttributeValue) -> Result<ProductAttributeValue>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based attribute value repository implementation
pub struct SqlxAttributeValueRepository {
    pool: DynDatabasePool,
}

impl SqlxAttributeValueRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AttributeValueRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AttributeValueRepository for SqlxAttributeValueRepository {
    async fn create(&self, value: &ProductAttributeValue) -> Result<ProductAttributeValue> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_value_sqlite(self.pool.as_sqlite().unwrap(), value).await,
            DatabaseDriver::Mysql => create_value_mysql(self.pool.as_mysql().unwrap(), value).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ProductAttributeValue>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_value_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_value_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_for(
        &self,
        product_id: i64,
        attribute_id: i64,
    ) -> Result<Option<ProductAttributeValue>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_value_for_sqlite(self.pool.as_sqlite().unwrap(), product_id, attribute_id).await
            }
            DatabaseDriver::Mysql => {
                get_value_for_mysql(self.pool.as_mysql().unwrap(), product_id, attribute_id).await
            }
        }
    }

    async fn list(&self, product_id: Option<i64>) -> Result<Vec<ProductAttributeValue>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_values_sqlite(self.pool.as_sqlite().unwrap(), product_id).await
            }
            DatabaseDriver::Mysql => list_values_mysql(self.pool.as_mysql().unwrap(), product_id).await,
        }
    }

    async fn exists_for_attribute(&self, attribute_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_for_attribute_sqlite(self.pool.as_sqlite().unwrap(), attribute_id).await
            }
            DatabaseDriver::Mysql => {
                exists_for_attribute_mysql(self.pool.as_mysql().unwrap(), attribute_id).await
            }
        }
    }

    async fn list_summaries(&self, product_id: i64) -> Result<Vec<ProductAttributeSummary>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_summaries_sqlite(self.pool.as_sqlite().unwrap(), product_id).await
            }
            DatabaseDriver::Mysql => {
                list_summaries_mysql(self.pool.as_mysql().unwrap(), product_id).await
            }
        }
    }

    async fn update(&self, value: &ProductAttributeValue) -> Result<ProductAttributeValue> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_value_sqlite(self.pool.as_sqlite().unwrap(), value).await,
            DatabaseDriver::Mysql => update_value_mysql(self.pool.as_mysql().unwrap(), value).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_value_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_value_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

fn encode_value(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string(value).context("Failed to serialize attribute value")
}

fn decode_value(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).context("Failed to parse stored attribute value")
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_value_sqlite(
    pool: &SqlitePool,
    value: &ProductAttributeValue,
) -> Result<ProductAttributeValue> {
    let result = sqlx::query(
        "INSERT INTO product_attribute_values (product_id, attribute_id, value_json) VALUES (?, ?, ?)",
    )
    .bind(value.product_id)
    .bind(value.attribute_id)
    .bind(encode_value(&value.value)?)
    .execute(pool)
    .await
    .context("Failed to create attribute value")?;

    Ok(ProductAttributeValue {
        id: result.last_insert_rowid(),
        ..value.clone()
    })
}

async fn get_value_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<ProductAttributeValue>> {
    let row = sqlx::query(
        "SELECT id, product_id, attribute_id, value_json FROM product_attribute_values WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get attribute value by ID")?;

    row.as_ref().map(row_to_value_sqlite).transpose()
}

async fn get_value_for_sqlite(
    pool: &SqlitePool,
    product_id: i64,
    attribute_id: i64,
) -> Result<Option<ProductAttributeValue>> {
    let row = sqlx::query(
        r#"
        SELECT id, product_id, attribute_id, value_json
        FROM product_attribute_values
        WHERE product_id = ? AND attribute_id = ?
        "#,
    )
    .bind(product_id)
    .bind(attribute_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get attribute value")?;

    row.as_ref().map(row_to_value_sqlite).transpose()
}

async fn list_values_sqlite(
    pool: &SqlitePool,
    product_id: Option<i64>,
) -> Result<Vec<ProductAttributeValue>> {
    let rows = match product_id {
        Some(product_id) => {
            sqlx::query(
                "SELECT id, product_id, attribute_id, value_json FROM product_attribute_values WHERE product_id = ? ORDER BY id",
            )
            .bind(product_id)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                "SELECT id, product_id, attribute_id, value_json FROM product_attribute_values ORDER BY id",
            )
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list attribute values")?;

    rows.iter().map(row_to_value_sqlite).collect()
}

async fn exists_for_attribute_sqlite(pool: &SqlitePool, attribute_id: i64) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM product_attribute_values WHERE attribute_id = ? LIMIT 1")
        .bind(attribute_id)
        .fetch_optional(pool)
        .await
        .context("Failed to check attribute values")?;

    Ok(row.is_some())
}

async fn list_summaries_sqlite(
    pool: &SqlitePool,
    product_id: i64,
) -> Result<Vec<ProductAttributeSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT a.name, a.code, v.value_json
        FROM product_attribute_values v
        INNER JOIN product_attributes a ON a.id = v.attribute_id
        WHERE v.product_id = ?
        ORDER BY a.name
        "#,
    )
    .bind(product_id)
    .fetch_all(pool)
    .await
    .context("Failed to list product attributes")?;

    rows.iter()
        .map(|row| -> Result<ProductAttributeSummary> {
            let raw: String = row.get("value_json");
            Ok(ProductAttributeSummary {
                name: row.get("name"),
                code: row.get("code"),
                value: decode_value(&raw)?,
            })
        })
        .collect()
}

async fn update_value_sqlite(
    pool: &SqlitePool,
    value: &ProductAttributeValue,
) -> Result<ProductAttributeValue> {
    sqlx::query(
        "UPDATE product_attribute_values SET product_id = ?, attribute_id = ?, value_json = ? WHERE id = ?",
    )
    .bind(value.product_id)
    .bind(value.attribute_id)
    .bind(encode_value(&value.value)?)
    .bind(value.id)
    .execute(pool)
    .await
    .context("Failed to update attribute value")?;

    get_value_by_id_sqlite(pool, value.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Attribute value not found after update"))
}

async fn delete_value_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM product_attribute_values WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete attribute value")?;

    Ok(())
}

fn row_to_value_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<ProductAttributeValue> {
    let raw: String = row.get("value_json");
    Ok(ProductAttributeValue {
        id: row.get("id"),
        product_id: row.get("product_id"),
        attribute_id: row.get("attribute_id"),
        value: decode_value(&raw)?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_value_mysql(
    pool: &MySqlPool,
    value: &ProductAttributeValue,
) -> Result<ProductAttributeValue> {
    let result = sqlx::query(
        "INSERT INTO product_attribute_values (product_id, attribute_id, value_json) VALUES (?, ?, ?)",
    )
    .bind(value.product_id)
    .bind(value.attribute_id)
    .bind(encode_value(&value.value)?)
    .execute(pool)
    .await
    .context("Failed to create attribute value")?;

    Ok(ProductAttributeValue {
        id: result.last_insert_id() as i64,
        ..value.clone()
    })
}

async fn get_value_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<ProductAttributeValue>> {
    let row = sqlx::query(
        "SELECT id, product_id, attribute_id, value_json FROM product_attribute_values WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get attribute value by ID")?;

    row.as_ref().map(row_to_value_mysql).transpose()
}

async fn get_value_for_mysql(
    pool: &MySqlPool,
    product_id: i64,
    attribute_id: i64,
) -> Result<Option<ProductAttributeValue>> {
    let row = sqlx::query(
        r#"
        SELECT id, product_id, attribute_id, value_json
        FROM product_attribute_values
        WHERE product_id = ? AND attribute_id = ?
        "#,
    )
    .bind(product_id)
    .bind(attribute_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get attribute value")?;

    row.as_ref().map(row_to_value_mysql).transpose()
}

async fn list_values_mysql(
    pool: &MySqlPool,
    product_id: Option<i64>,
) -> Result<Vec<ProductAttributeValue>> {
    let rows = match product_id {
        Some(product_id) => {
            sqlx::query(
                "SELECT id, product_id, attribute_id, value_json FROM product_attribute_values WHERE product_id = ? ORDER BY id",
            )
            .bind(product_id)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                "SELECT id, product_id, attribute_id, value_json FROM product_attribute_values ORDER BY id",
            )
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list attribute values")?;

    rows.iter().map(row_to_value_mysql).collect()
}

async fn exists_for_attribute_mysql(pool: &MySqlPool, attribute_id: i64) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM product_attribute_values WHERE attribute_id = ? LIMIT 1")
        .bind(attribute_id)
        .fetch_optional(pool)
        .await
        .context("Failed to check attribute values")?;

    Ok(row.is_some())
}

async fn list_summaries_mysql(
    pool: &MySqlPool,
    product_id: i64,
) -> Result<Vec<ProductAttributeSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT a.name, a.code, v.value_json
        FROM product_attribute_values v
        INNER JOIN product_attributes a ON a.id = v.attribute_id
        WHERE v.product_id = ?
        ORDER BY a.name
        "#,
    )
    .bind(product_id)
    .fetch_all(pool)
    .await
    .context("Failed to list product attributes")?;

    rows.iter()
        .map(|row| -> Result<ProductAttributeSummary> {
            let raw: String = row.get("value_json");
            Ok(ProductAttributeSummary {
                name: row.get("name"),
                code: row.get("code"),
                value: decode_value(&raw)?,
            })
        })
        .collect()
}

async fn update_value_mysql(
    pool: &MySqlPool,
    value: &ProductAttributeValue,
) -> Result<ProductAttributeValue> {
    sqlx::query(
        "UPDATE product_attribute_values SET product_id = ?, attribute_id = ?, value_json = ? WHERE id = ?",
    )
    .bind(value.product_id)
    .bind(value.attribute_id)
    .bind(encode_value(&value.value)?)
    .bind(value.id)
    .execute(pool)
    .await
    .context("Failed to update attribute value")?;

    get_value_by_id_mysql(pool, value.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Attribute value not found after update"))
}

async fn delete_value_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM product_attribute_values WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete attribute value")?;

    Ok(())
}

fn row_to_value_mysql(row: &sqlx::mysql::MySqlRow) -> Result<ProductAttributeValue> {
    let raw: String = row.get("value_json");
    Ok(ProductAttributeValue {
        id: row.get("id"),
        product_id: row.get("product_id"),
        attribute_id: row.get("attribute_id"),
        value: decode_value(&raw)?,
    })
}
