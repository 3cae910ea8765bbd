//! Product image repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::ProductImage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Image repository trait
#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn create(&self, image: &ProductImage) -> Result<ProductImage>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ProductImage>>;

    /// List images, optionally only those of one product, primary image first
    async fn list(&self, product_id: Option<i64>) -> Result<Vec<ProductImage>>;

    async fn update(&self, image: &ProductImage) -> Result<ProductImage>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based image repository implementation
pub struct SqlxImageRepository {
    pool: DynDatabasePool,
}

impl SqlxImageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ImageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ImageRepository for SqlxImageRepository {
    async fn create(&self, image: &ProductImage) -> Result<ProductImage> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_image_sqlite(self.pool.as_sqlite().unwrap(), image).await,
            DatabaseDriver::Mysql => create_image_mysql(self.pool.as_mysql().unwrap(), image).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ProductImage>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_image_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_image_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self, product_id: Option<i64>) -> Result<Vec<ProductImage>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_images_sqlite(self.pool.as_sqlite().unwrap(), product_id).await
            }
            DatabaseDriver::Mysql => list_images_mysql(self.pool.as_mysql().unwrap(), product_id).await,
        }
    }

    async fn update(&self, image: &ProductImage) -> Result<ProductImage> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_image_sqlite(self.pool.as_sqlite().unwrap(), image).await,
            DatabaseDriver::Mysql => update_image_mysql(self.pool.as_mysql().unwrap(), image).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_image_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_image_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_image_sqlite(pool: &SqlitePool, image: &ProductImage) -> Result<ProductImage> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO product_images (product_id, original, caption, display_order, date_created)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(image.product_id)
    .bind(&image.original)
    .bind(&image.caption)
    .bind(image.display_order)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create image")?;

    Ok(ProductImage {
        id: result.last_insert_rowid(),
        date_created: now,
        ..image.clone()
    })
}

async fn get_image_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<ProductImage>> {
    let row = sqlx::query(
        r#"
        SELECT id, product_id, original, caption, display_order, date_created
        FROM product_images
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get image by ID")?;

    row.as_ref().map(row_to_image_sqlite).transpose()
}

async fn list_images_sqlite(pool: &SqlitePool, product_id: Option<i64>) -> Result<Vec<ProductImage>> {
    let rows = match product_id {
        Some(product_id) => {
            sqlx::query(
                r#"
                SELECT id, product_id, original, caption, display_order, date_created
                FROM product_images
                WHERE product_id = ?
                ORDER BY display_order, id
                "#,
            )
            .bind(product_id)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, product_id, original, caption, display_order, date_created
                FROM product_images
                ORDER BY product_id, display_order, id
                "#,
            )
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list images")?;

    rows.iter().map(row_to_image_sqlite).collect()
}

async fn update_image_sqlite(pool: &SqlitePool, image: &ProductImage) -> Result<ProductImage> {
    sqlx::query(
        "UPDATE product_images SET product_id = ?, original = ?, caption = ?, display_order = ? WHERE id = ?",
    )
    .bind(image.product_id)
    .bind(&image.original)
    .bind(&image.caption)
    .bind(image.display_order)
    .bind(image.id)
    .execute(pool)
    .await
    .context("Failed to update image")?;

    get_image_by_id_sqlite(pool, image.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Image not found after update"))
}

async fn delete_image_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM product_images WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete image")?;

    Ok(())
}

fn row_to_image_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<ProductImage> {
    Ok(ProductImage {
        id: row.get("id"),
        product_id: row.get("product_id"),
        original: row.get("original"),
        caption: row.get("caption"),
        display_order: row.get("display_order"),
        date_created: row.get("date_created"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_image_mysql(pool: &MySqlPool, image: &ProductImage) -> Result<ProductImage> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO product_images (product_id, original, caption, display_order, date_created)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(image.product_id)
    .bind(&image.original)
    .bind(&image.caption)
    .bind(image.display_order)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create image")?;

    Ok(ProductImage {
        id: result.last_insert_id() as i64,
        date_created: now,
        ..image.clone()
    })
}

async fn get_image_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<ProductImage>> {
    let row = sqlx::query(
        r#"
        SELECT id, product_id, original, caption, display_order, date_created
        FROM product_images
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get image by ID")?;

    row.as_ref().map(row_to_image_mysql).transpose()
}

async fn list_images_mysql(pool: &MySqlPool, product_id: Option<i64>) -> Result<Vec<ProductImage>> {
    let rows = match product_id {
        Some(product_id) => {
            sqlx::query(
                r#"
                SELECT id, product_id, original, caption, display_order, date_created
                FROM product_images
                WHERE product_id = ?
                ORDER BY display_order, id
                "#,
            )
            .bind(product_id)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, product_id, original, caption, display_order, date_created
                FROM product_images
                ORDER BY product_id, display_order, id
                "#,
            )
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list images")?;

    rows.iter().map(row_to_image_mysql).collect()
}

async fn update_image_mysql(pool: &MySqlPool, image: &ProductImage) -> Result<ProductImage> {
    sqlx::query(
        "UPDATE product_images SET product_id = ?, original = ?, caption = ?, display_order = ? WHERE id = ?",
    )
    .bind(image.product_id)
    .bind(&image.original)
    .bind(&image.caption)
    .bind(image.display_order)
    .bind(image.id)
    .execute(pool)
    .await
    .context("Failed to update image")?;

    get_image_by_id_mysql(pool, image.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Image not found after update"))
}

async fn delete_image_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM product_images WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete image")?;

    Ok(())
}

fn row_to_image_mysql(row: &sqlx::mysql::MySqlRow) -> Result<ProductImage> {
    Ok(ProductImage {
        id: row.get("id"),
        product_id: row.get("product_id"),
        original: row.get("original"),
        caption: row.get("caption"),
        display_order: row.get("display_order"),
        date_created: row.get("date_created"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxImageRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        sqlx::query("INSERT INTO products (id, structure, title, slug) VALUES (1, 'standalone', 'Mug', 'mug')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        SqlxImageRepository::new(pool)
    }

    fn image(original: &str, display_order: i32) -> ProductImage {
        ProductImage {
            id: 0,
            product_id: 1,
            original: original.to_string(),
            caption: String::new(),
            display_order,
            date_created: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_images_ordered_by_display_order() {
        let repo = setup_test_repo().await;

        repo.create(&image("images/back.jpg", 2)).await.unwrap();
        repo.create(&image("images/front.jpg", 0)).await.unwrap();

        let images = repo.list(Some(1)).await.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].original, "images/front.jpg");
        assert!(repo.list(Some(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_image() {
        let repo = setup_test_repo().await;

        let mut created = repo.create(&image("images/a.jpg", 0)).await.unwrap();
        created.caption = "Side view".to_string();
        let updated = repo.update(&created).await.unwrap();
        assert_eq!(updated.caption, "Side view");

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_image_requires_existing_product() {
        let repo = setup_test_repo().await;

        let mut orphan = image("images/x.jpg", 0);
        orphan.product_id = 77;
        assert!(repo.create(&orphan).await.is_err());
    }
}
