//! Product attribute repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{AttributeType, ProductAttribute};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Attribute repository trait
#[async_trait]
pub trait AttributeRepository: Send + Sync {
    async fn create(&self, attribute: &ProductAttribute) -> Result<ProductAttribute>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ProductAttribute>>;

    async fn get_by_code(&self, code: &str) -> Result<Option<ProductAttribute>>;

    /// List all attributes ordered by name
    async fn list(&self) -> Result<Vec<ProductAttribute>>;

    async fn update(&self, attribute: &ProductAttribute) -> Result<ProductAttribute>;

    /// Delete an attribute along with every value recorded for it
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based attribute repository implementation
pub struct SqlxAttributeRepository {
    pool: DynDatabasePool,
}

impl SqlxAttributeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AttributeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AttributeRepository for SqlxAttributeRepository {
    async fn create(&self, attribute: &ProductAttribute) -> Result<ProductAttribute> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_attribute_sqlite(self.pool.as_sqlite().unwrap(), attribute).await
            }
            DatabaseDriver::Mysql => {
                create_attribute_mysql(self.pool.as_mysql().unwrap(), attribute).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ProductAttribute>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_attribute_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_attribute_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<ProductAttribute>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_attribute_by_code_sqlite(self.pool.as_sqlite().unwrap(), code).await
            }
            DatabaseDriver::Mysql => {
                get_attribute_by_code_mysql(self.pool.as_mysql().unwrap(), code).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<ProductAttribute>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_attributes_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_attributes_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn update(&self, attribute: &ProductAttribute) -> Result<ProductAttribute> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_attribute_sqlite(self.pool.as_sqlite().unwrap(), attribute).await
            }
            DatabaseDriver::Mysql => {
                update_attribute_mysql(self.pool.as_mysql().unwrap(), attribute).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_attribute_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_attribute_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

fn parse_attr_type(raw: &str) -> Result<AttributeType> {
    AttributeType::from_str(raw)
        .ok_or_else(|| anyhow::anyhow!("Unknown attribute type in database: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_attribute_sqlite(
    pool: &SqlitePool,
    attribute: &ProductAttribute,
) -> Result<ProductAttribute> {
    let result = sqlx::query(
        "INSERT INTO product_attributes (name, code, attr_type, required) VALUES (?, ?, ?, ?)",
    )
    .bind(&attribute.name)
    .bind(&attribute.code)
    .bind(attribute.attr_type.as_str())
    .bind(attribute.required)
    .execute(pool)
    .await
    .context("Failed to create attribute")?;

    Ok(ProductAttribute {
        id: result.last_insert_rowid(),
        ..attribute.clone()
    })
}

async fn get_attribute_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<ProductAttribute>> {
    let row = sqlx::query(
        "SELECT id, name, code, attr_type, required FROM product_attributes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get attribute by ID")?;

    row.as_ref().map(row_to_attribute_sqlite).transpose()
}

async fn get_attribute_by_code_sqlite(
    pool: &SqlitePool,
    code: &str,
) -> Result<Option<ProductAttribute>> {
    let row = sqlx::query(
        "SELECT id, name, code, attr_type, required FROM product_attributes WHERE code = ?",
    )
    .bind(code)
    .fetch_optional(pool)
    .await
    .context("Failed to get attribute by code")?;

    row.as_ref().map(row_to_attribute_sqlite).transpose()
}

async fn list_attributes_sqlite(pool: &SqlitePool) -> Result<Vec<ProductAttribute>> {
    let rows = sqlx::query(
        "SELECT id, name, code, attr_type, required FROM product_attributes ORDER BY name, id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list attributes")?;

    rows.iter().map(row_to_attribute_sqlite).collect()
}

async fn update_attribute_sqlite(
    pool: &SqlitePool,
    attribute: &ProductAttribute,
) -> Result<ProductAttribute> {
    sqlx::query(
        "UPDATE product_attributes SET name = ?, code = ?, attr_type = ?, required = ? WHERE id = ?",
    )
    .bind(&attribute.name)
    .bind(&attribute.code)
    .bind(attribute.attr_type.as_str())
    .bind(attribute.required)
    .bind(attribute.id)
    .execute(pool)
    .await
    .context("Failed to update attribute")?;

    get_attribute_by_id_sqlite(pool, attribute.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Attribute not found after update"))
}

async fn delete_attribute_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM product_attributes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete attribute")?;

    Ok(())
}

fn row_to_attribute_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<ProductAttribute> {
    let attr_type: String = row.get("attr_type");
    Ok(ProductAttribute {
        id: row.get("id"),
        name: row.get("name"),
        code: row.get("code"),
        attr_type: parse_attr_type(&attr_type)?,
        required: row.get("required"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_attribute_mysql(
    pool: &MySqlPool,
    attribute: &ProductAttribute,
) -> Result<ProductAttribute> {
    let result = sqlx::query(
        "INSERT INTO product_attributes (name, code, attr_type, required) VALUES (?, ?, ?, ?)",
    )
    .bind(&attribute.name)
    .bind(&attribute.code)
    .bind(attribute.attr_type.as_str())
    .bind(attribute.required)
    .execute(pool)
    .await
    .context("Failed to create attribute")?;

    Ok(ProductAttribute {
        id: result.last_insert_id() as i64,
        ..attribute.clone()
    })
}

async fn get_attribute_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<ProductAttribute>> {
    let row = sqlx::query(
        "SELECT id, name, code, attr_type, required FROM product_attributes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get attribute by ID")?;

    row.as_ref().map(row_to_attribute_mysql).transpose()
}

async fn get_attribute_by_code_mysql(
    pool: &MySqlPool,
    code: &str,
) -> Result<Option<ProductAttribute>> {
    let row = sqlx::query(
        "SELECT id, name, code, attr_type, required FROM product_attributes WHERE code = ?",
    )
    .bind(code)
    .fetch_optional(pool)
    .await
    .context("Failed to get attribute by code")?;

    row.as_ref().map(row_to_attribute_mysql).transpose()
}

async fn list_attributes_mysql(pool: &MySqlPool) -> Result<Vec<ProductAttribute>> {
    let rows = sqlx::query(
        "SELECT id, name, code, attr_type, required FROM product_attributes ORDER BY name, id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list attributes")?;

    rows.iter().map(row_to_attribute_mysql).collect()
}

async fn update_attribute_mysql(
    pool: &MySqlPool,
    attribute: &ProductAttribute,
) -> Result<ProductAttribute> {
    sqlx::query(
        "UPDATE product_attributes SET name = ?, code = ?, attr_type = ?, required = ? WHERE id = ?",
    )
    .bind(&attribute.name)
    .bind(&attribute.code)
    .bind(attribute.attr_type.as_str())
    .bind(attribute.required)
    .bind(attribute.id)
    .execute(pool)
    .await
    .context("Failed to update attribute")?;

    get_attribute_by_id_mysql(pool, attribute.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Attribute not found after update"))
}

async fn delete_attribute_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM product_attributes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete attribute")?;

    Ok(())
}

fn row_to_attribute_mysql(row: &sqlx::mysql::MySqlRow) -> Result<ProductAttribute> {
    let attr_type: String = row.get("attr_type");
    Ok(ProductAttribute {
        id: row.get("id"),
        name: row.get("name"),
        code: row.get("code"),
        attr_type: parse_attr_type(&attr_type)?,
        required: row.get("required"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxAttributeRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxAttributeRepository::new(pool)
    }

    fn attribute(name: &str, code: &str, attr_type: AttributeType) -> ProductAttribute {
        ProductAttribute {
            id: 0,
            name: name.to_string(),
            code: code.to_string(),
            attr_type,
            required: false,
        }
    }

    #[tokio::test]
    async fn test_attribute_crud() {
        let repo = setup_test_repo().await;

        let created = repo
            .create(&attribute("Weight", "weight", AttributeType::Float))
            .await
            .unwrap();
        assert!(created.id > 0);

        let by_code = repo.get_by_code("weight").await.unwrap().unwrap();
        assert_eq!(by_code.attr_type, AttributeType::Float);

        let mut changed = created.clone();
        changed.required = true;
        changed.attr_type = AttributeType::Integer;
        let updated = repo.update(&changed).await.unwrap();
        assert!(updated.required);
        assert_eq!(updated.attr_type, AttributeType::Integer);

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_code_is_unique() {
        let repo = setup_test_repo().await;

        repo.create(&attribute("Colour", "colour", AttributeType::Text))
            .await
            .unwrap();
        assert!(repo
            .create(&attribute("Color", "colour", AttributeType::Text))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_list_ordered_by_name() {
        let repo = setup_test_repo().await;

        repo.create(&attribute("Width", "width", AttributeType::Integer))
            .await
            .unwrap();
        repo.create(&attribute("Colour", "colour", AttributeType::Text))
            .await
            .unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["Colour", "Width"]);
    }
}
