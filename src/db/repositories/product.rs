//! Product repository
//!
//! Database operations for products and their category links.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Product, ProductStructure};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

/// Product repository trait
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Create a new product linked to `category_ids`, in one transaction
    async fn create(&self, product: &Product, category_ids: &[i64]) -> Result<Product>;

    /// Get product by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Product>>;

    /// Get product by UPC
    async fn get_by_upc(&self, upc: &str) -> Result<Option<Product>>;

    /// List products with pagination, optionally restricted to one structure
    async fn list(
        &self,
        structure: Option<ProductStructure>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Product>>;

    /// Count products, optionally restricted to one structure
    async fn count(&self, structure: Option<ProductStructure>) -> Result<i64>;

    /// Children of a parent product, in id order
    async fn list_children(&self, parent_id: i64) -> Result<Vec<Product>>;

    /// Update a product. `Some` replaces its category links in the same
    /// transaction; `None` leaves them alone.
    async fn update(&self, product: &Product, category_ids: Option<&[i64]>) -> Result<Product>;

    /// Delete a product; children, images, stock records, attribute values and
    /// category links go with it
    async fn delete(&self, id: i64) -> Result<()>;

    /// Ids of the categories a product is linked to
    async fn get_category_ids(&self, product_id: i64) -> Result<Vec<i64>>;
}

/// SQLx-based product repository implementation
pub struct SqlxProductRepository {
    pool: DynDatabasePool,
}

impl SqlxProductRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProductRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProductRepository for SqlxProductRepository {
    async fn create(&self, product: &Product, category_ids: &[i64]) -> Result<Product> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_product_sqlite(self.pool.as_sqlite().unwrap(), product, category_ids).await
            }
            DatabaseDriver::Mysql => {
                create_product_mysql(self.pool.as_mysql().unwrap(), product, category_ids).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Product>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_product_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_product_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_by_upc(&self, upc: &str) -> Result<Option<Product>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_product_by_upc_sqlite(self.pool.as_sqlite().unwrap(), upc).await
            }
            DatabaseDriver::Mysql => {
                get_product_by_upc_mysql(self.pool.as_mysql().unwrap(), upc).await
            }
        }
    }

    async fn list(
        &self,
        structure: Option<ProductStructure>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Product>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_products_sqlite(self.pool.as_sqlite().unwrap(), structure, offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_products_mysql(self.pool.as_mysql().unwrap(), structure, offset, limit).await
            }
        }
    }

    async fn count(&self, structure: Option<ProductStructure>) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_products_sqlite(self.pool.as_sqlite().unwrap(), structure).await
            }
            DatabaseDriver::Mysql => {
                count_products_mysql(self.pool.as_mysql().unwrap(), structure).await
            }
        }
    }

    async fn list_children(&self, parent_id: i64) -> Result<Vec<Product>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_children_sqlite(self.pool.as_sqlite().unwrap(), parent_id).await
            }
            DatabaseDriver::Mysql => {
                list_children_mysql(self.pool.as_mysql().unwrap(), parent_id).await
            }
        }
    }

    async fn update(&self, product: &Product, category_ids: Option<&[i64]>) -> Result<Product> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_product_sqlite(self.pool.as_sqlite().unwrap(), product, category_ids).await
            }
            DatabaseDriver::Mysql => {
                update_product_mysql(self.pool.as_mysql().unwrap(), product, category_ids).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_product_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_product_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_category_ids(&self, product_id: i64) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_ids_sqlite(self.pool.as_sqlite().unwrap(), product_id).await
            }
            DatabaseDriver::Mysql => {
                get_category_ids_mysql(self.pool.as_mysql().unwrap(), product_id).await
            }
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, structure, upc, parent_id, title, slug, description, is_public, date_created, date_updated";

fn parse_structure(raw: &str) -> Result<ProductStructure> {
    ProductStructure::from_str(raw)
        .ok_or_else(|| anyhow::anyhow!("Unknown product structure in database: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_product_sqlite(
    pool: &SqlitePool,
    product: &Product,
    category_ids: &[i64],
) -> Result<Product> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO products (structure, upc, parent_id, title, slug, description, is_public, date_created, date_updated)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(product.structure.as_str())
    .bind(&product.upc)
    .bind(product.parent_id)
    .bind(&product.title)
    .bind(&product.slug)
    .bind(&product.description)
    .bind(product.is_public)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create product")?;
    let id = result.last_insert_rowid();

    replace_categories_sqlite(&mut tx, id, category_ids).await?;
    tx.commit().await.context("Failed to commit product")?;

    Ok(Product {
        id,
        date_created: now,
        date_updated: now,
        ..product.clone()
    })
}

async fn get_product_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get product by ID")?;

    row.as_ref().map(row_to_product_sqlite).transpose()
}

async fn get_product_by_upc_sqlite(pool: &SqlitePool, upc: &str) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE upc = ?", PRODUCT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(upc)
        .fetch_optional(pool)
        .await
        .context("Failed to get product by UPC")?;

    row.as_ref().map(row_to_product_sqlite).transpose()
}

async fn list_products_sqlite(
    pool: &SqlitePool,
    structure: Option<ProductStructure>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Product>> {
    let rows = match structure {
        Some(structure) => {
            let sql = format!(
                "SELECT {} FROM products WHERE structure = ? ORDER BY id LIMIT ? OFFSET ?",
                PRODUCT_COLUMNS
            );
            sqlx::query(&sql)
                .bind(structure.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
        }
        None => {
            let sql = format!(
                "SELECT {} FROM products ORDER BY id LIMIT ? OFFSET ?",
                PRODUCT_COLUMNS
            );
            sqlx::query(&sql).bind(limit).bind(offset).fetch_all(pool).await
        }
    }
    .context("Failed to list products")?;

    rows.iter().map(row_to_product_sqlite).collect()
}

async fn count_products_sqlite(pool: &SqlitePool, structure: Option<ProductStructure>) -> Result<i64> {
    let row = match structure {
        Some(structure) => {
            sqlx::query("SELECT COUNT(*) as count FROM products WHERE structure = ?")
                .bind(structure.as_str())
                .fetch_one(pool)
                .await
        }
        None => {
            sqlx::query("SELECT COUNT(*) as count FROM products")
                .fetch_one(pool)
                .await
        }
    }
    .context("Failed to count products")?;

    Ok(row.get("count"))
}

async fn list_children_sqlite(pool: &SqlitePool, parent_id: i64) -> Result<Vec<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE parent_id = ? ORDER BY id",
        PRODUCT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(parent_id)
        .fetch_all(pool)
        .await
        .context("Failed to list child products")?;

    rows.iter().map(row_to_product_sqlite).collect()
}

async fn update_product_sqlite(
    pool: &SqlitePool,
    product: &Product,
    category_ids: Option<&[i64]>,
) -> Result<Product> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE products
        SET structure = ?, upc = ?, parent_id = ?, title = ?, slug = ?, description = ?,
            is_public = ?, date_updated = ?
        WHERE id = ?
        "#,
    )
    .bind(product.structure.as_str())
    .bind(&product.upc)
    .bind(product.parent_id)
    .bind(&product.title)
    .bind(&product.slug)
    .bind(&product.description)
    .bind(product.is_public)
    .bind(Utc::now())
    .bind(product.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update product")?;

    if let Some(category_ids) = category_ids {
        replace_categories_sqlite(&mut tx, product.id, category_ids).await?;
    }
    tx.commit().await.context("Failed to commit product")?;

    get_product_by_id_sqlite(pool, product.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Product not found after update"))
}

async fn delete_product_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete product")?;

    Ok(())
}

/// Replace a product's category links inside the caller's transaction
async fn replace_categories_sqlite(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: i64,
    category_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM product_categories WHERE product_id = ?")
        .bind(product_id)
        .execute(&mut **tx)
        .await
        .context("Failed to clear product categories")?;

    for category_id in category_ids {
        sqlx::query("INSERT OR IGNORE INTO product_categories (product_id, category_id) VALUES (?, ?)")
            .bind(product_id)
            .bind(category_id)
            .execute(&mut **tx)
            .await
            .context("Failed to link product to category")?;
    }

    Ok(())
}

async fn get_category_ids_sqlite(pool: &SqlitePool, product_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query(
        "SELECT category_id FROM product_categories WHERE product_id = ? ORDER BY category_id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await
    .context("Failed to get product category ids")?;

    Ok(rows.iter().map(|row| row.get("category_id")).collect())
}

fn row_to_product_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Product> {
    let structure: String = row.get("structure");
    Ok(Product {
        id: row.get("id"),
        structure: parse_structure(&structure)?,
        upc: row.get("upc"),
        parent_id: row.get("parent_id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        is_public: row.get("is_public"),
        date_created: row.get("date_created"),
        date_updated: row.get("date_updated"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_product_mysql(
    pool: &MySqlPool,
    product: &Product,
    category_ids: &[i64],
) -> Result<Product> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO products (structure, upc, parent_id, title, slug, description, is_public, date_created, date_updated)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(product.structure.as_str())
    .bind(&product.upc)
    .bind(product.parent_id)
    .bind(&product.title)
    .bind(&product.slug)
    .bind(&product.description)
    .bind(product.is_public)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create product")?;
    let id = result.last_insert_id() as i64;

    replace_categories_mysql(&mut tx, id, category_ids).await?;
    tx.commit().await.context("Failed to commit product")?;

    Ok(Product {
        id,
        date_created: now,
        date_updated: now,
        ..product.clone()
    })
}

async fn get_product_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get product by ID")?;

    row.as_ref().map(row_to_product_mysql).transpose()
}

async fn get_product_by_upc_mysql(pool: &MySqlPool, upc: &str) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE upc = ?", PRODUCT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(upc)
        .fetch_optional(pool)
        .await
        .context("Failed to get product by UPC")?;

    row.as_ref().map(row_to_product_mysql).transpose()
}

async fn list_products_mysql(
    pool: &MySqlPool,
    structure: Option<ProductStructure>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Product>> {
    let rows = match structure {
        Some(structure) => {
            let sql = format!(
                "SELECT {} FROM products WHERE structure = ? ORDER BY id LIMIT ? OFFSET ?",
                PRODUCT_COLUMNS
            );
            sqlx::query(&sql)
                .bind(structure.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
        }
        None => {
            let sql = format!(
                "SELECT {} FROM products ORDER BY id LIMIT ? OFFSET ?",
                PRODUCT_COLUMNS
            );
            sqlx::query(&sql).bind(limit).bind(offset).fetch_all(pool).await
        }
    }
    .context("Failed to list products")?;

    rows.iter().map(row_to_product_mysql).collect()
}

async fn count_products_mysql(pool: &MySqlPool, structure: Option<ProductStructure>) -> Result<i64> {
    let row = match structure {
        Some(structure) => {
            sqlx::query("SELECT COUNT(*) as count FROM products WHERE structure = ?")
                .bind(structure.as_str())
                .fetch_one(pool)
                .await
        }
        None => {
            sqlx::query("SELECT COUNT(*) as count FROM products")
                .fetch_one(pool)
                .await
        }
    }
    .context("Failed to count products")?;

    Ok(row.get("count"))
}

async fn list_children_mysql(pool: &MySqlPool, parent_id: i64) -> Result<Vec<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE parent_id = ? ORDER BY id",
        PRODUCT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(parent_id)
        .fetch_all(pool)
        .await
        .context("Failed to list child products")?;

    rows.iter().map(row_to_product_mysql).collect()
}

async fn update_product_mysql(
    pool: &MySqlPool,
    product: &Product,
    category_ids: Option<&[i64]>,
) -> Result<Product> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE products
        SET structure = ?, upc = ?, parent_id = ?, title = ?, slug = ?, description = ?,
            is_public = ?, date_updated = ?
        WHERE id = ?
        "#,
    )
    .bind(product.structure.as_str())
    .bind(&product.upc)
    .bind(product.parent_id)
    .bind(&product.title)
    .bind(&product.slug)
    .bind(&product.description)
    .bind(product.is_public)
    .bind(Utc::now())
    .bind(product.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update product")?;

    if let Some(category_ids) = category_ids {
        replace_categories_mysql(&mut tx, product.id, category_ids).await?;
    }
    tx.commit().await.context("Failed to commit product")?;

    get_product_by_id_mysql(pool, product.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Product not found after update"))
}

async fn delete_product_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete product")?;

    Ok(())
}

/// Replace a product's category links inside the caller's transaction
async fn replace_categories_mysql(
    tx: &mut Transaction<'_, MySql>,
    product_id: i64,
    category_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM product_categories WHERE product_id = ?")
        .bind(product_id)
        .execute(&mut **tx)
        .await
        .context("Failed to clear product categories")?;

    for category_id in category_ids {
        sqlx::query("INSERT IGNORE INTO product_categories (product_id, category_id) VALUES (?, ?)")
            .bind(product_id)
            .bind(category_id)
            .execute(&mut **tx)
            .await
            .context("Failed to link product to category")?;
    }

    Ok(())
}

async fn get_category_ids_mysql(pool: &MySqlPool, product_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query(
        "SELECT category_id FROM product_categories WHERE product_id = ? ORDER BY category_id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await
    .context("Failed to get product category ids")?;

    Ok(rows.iter().map(|row| row.get("category_id")).collect())
}

fn row_to_product_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Product> {
    let structure: String = row.get("structure");
    Ok(Product {
        id: row.get("id"),
        structure: parse_structure(&structure)?,
        upc: row.get("upc"),
        parent_id: row.get("parent_id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        is_public: row.get("is_public"),
        date_created: row.get("date_created"),
        date_updated: row.get("date_updated"),
    })
}
