//! Category repository
//!
//! Database operations for the category tree.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Find the child of `parent_id` (or the root when None) with this slug
    async fn get_child_by_slug(&self, parent_id: Option<i64>, slug: &str)
        -> Result<Option<Category>>;

    /// List root categories
    async fn list_roots(&self) -> Result<Vec<Category>>;

    /// Get direct children of a category
    async fn get_children(&self, parent_id: i64) -> Result<Vec<Category>>;

    /// Get the path from the root down to this category (inclusive)
    async fn get_ancestors(&self, id: i64) -> Result<Vec<Category>>;

    /// Get all descendants of a category (recursive)
    /// Returns all category IDs including the given category ID
    async fn get_all_descendants(&self, id: i64) -> Result<Vec<i64>>;

    /// Categories a product is linked to
    async fn list_for_product(&self, product_id: i64) -> Result<Vec<Category>>;

    /// Update a category
    async fn update(&self, category: &Category) -> Result<Category>;

    /// Delete a category and, through the foreign key cascade, its subtree
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check whether a sibling already uses this slug
    async fn exists_sibling_slug(
        &self,
        parent_id: Option<i64>,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_category_sqlite(self.pool.as_sqlite().unwrap(), category).await
            }
            DatabaseDriver::Mysql => {
                create_category_mysql(self.pool.as_mysql().unwrap(), category).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_child_by_slug(
        &self,
        parent_id: Option<i64>,
        slug: &str,
    ) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_child_by_slug_sqlite(self.pool.as_sqlite().unwrap(), parent_id, slug).await
            }
            DatabaseDriver::Mysql => {
                get_child_by_slug_mysql(self.pool.as_mysql().unwrap(), parent_id, slug).await
            }
        }
    }

    async fn list_roots(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_roots_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_roots_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn get_children(&self, parent_id: i64) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_children_sqlite(self.pool.as_sqlite().unwrap(), parent_id).await
            }
            DatabaseDriver::Mysql => {
                get_children_mysql(self.pool.as_mysql().unwrap(), parent_id).await
            }
        }
    }

    async fn get_ancestors(&self, id: i64) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_ancestors_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_ancestors_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_all_descendants(&self, id: i64) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_all_descendants_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_all_descendants_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn list_for_product(&self, product_id: i64) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_for_product_sqlite(self.pool.as_sqlite().unwrap(), product_id).await
            }
            DatabaseDriver::Mysql => {
                list_for_product_mysql(self.pool.as_mysql().unwrap(), product_id).await
            }
        }
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_category_sqlite(self.pool.as_sqlite().unwrap(), category).await
            }
            DatabaseDriver::Mysql => {
                update_category_mysql(self.pool.as_mysql().unwrap(), category).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_category_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_category_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn exists_sibling_slug(
        &self,
        parent_id: Option<i64>,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_sibling_slug_sqlite(self.pool.as_sqlite().unwrap(), parent_id, slug, exclude_id)
                    .await
            }
            DatabaseDriver::Mysql => {
                exists_sibling_slug_mysql(self.pool.as_mysql().unwrap(), parent_id, slug, exclude_id)
                    .await
            }
        }
    }
}

const CATEGORY_COLUMNS: &str =
    "c.id, c.name, c.slug, c.description, c.parent_id, c.sort_order, c.is_public, c.created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, slug, description, parent_id, sort_order, is_public, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(&category.description)
    .bind(category.parent_id)
    .bind(category.sort_order)
    .bind(category.is_public)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        created_at: now,
        ..category.clone()
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories c WHERE c.id = ?", CATEGORY_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

async fn get_child_by_slug_sqlite(
    pool: &SqlitePool,
    parent_id: Option<i64>,
    slug: &str,
) -> Result<Option<Category>> {
    // `IS` compares NULL parents as equal in SQLite.
    let sql = format!(
        "SELECT {} FROM categories c WHERE c.parent_id IS ? AND c.slug = ?",
        CATEGORY_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(parent_id)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

async fn list_roots_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories c WHERE c.parent_id IS NULL ORDER BY c.sort_order, c.name",
        CATEGORY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list root categories")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

async fn get_children_sqlite(pool: &SqlitePool, parent_id: i64) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories c WHERE c.parent_id = ? ORDER BY c.sort_order, c.name",
        CATEGORY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(parent_id)
        .fetch_all(pool)
        .await
        .context("Failed to get children categories")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

/// Walk up the tree with a recursive CTE; deepest rows have the highest depth.
async fn get_ancestors_sqlite(pool: &SqlitePool, id: i64) -> Result<Vec<Category>> {
    let sql = format!(
        r#"
        WITH RECURSIVE ancestors(id, parent_id, depth) AS (
            SELECT id, parent_id, 0 FROM categories WHERE id = ?
            UNION ALL
            SELECT p.id, p.parent_id, a.depth + 1
            FROM categories p
            INNER JOIN ancestors a ON p.id = a.parent_id
        )
        SELECT {}
        FROM categories c
        INNER JOIN ancestors a ON c.id = a.id
        ORDER BY a.depth DESC
        "#,
        CATEGORY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(id)
        .fetch_all(pool)
        .await
        .context("Failed to get category ancestors")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

async fn get_all_descendants_sqlite(pool: &SqlitePool, id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query(
        r#"
        WITH RECURSIVE descendants AS (
            SELECT id FROM categories WHERE id = ?
            UNION ALL
            SELECT c.id
            FROM categories c
            INNER JOIN descendants d ON c.parent_id = d.id
        )
        SELECT id FROM descendants
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .context("Failed to get all descendants")?;

    Ok(rows.iter().map(|row| row.get("id")).collect())
}

async fn list_for_product_sqlite(pool: &SqlitePool, product_id: i64) -> Result<Vec<Category>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM categories c
        INNER JOIN product_categories pc ON pc.category_id = c.id
        WHERE pc.product_id = ?
        ORDER BY c.sort_order, c.name
        "#,
        CATEGORY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(product_id)
        .fetch_all(pool)
        .await
        .context("Failed to list product categories")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

async fn update_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    sqlx::query(
        r#"
        UPDATE categories
        SET name = ?, slug = ?, description = ?, parent_id = ?, sort_order = ?, is_public = ?
        WHERE id = ?
        "#,
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(&category.description)
    .bind(category.parent_id)
    .bind(category.sort_order)
    .bind(category.is_public)
    .bind(category.id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    get_category_by_id_sqlite(pool, category.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn exists_sibling_slug_sqlite(
    pool: &SqlitePool,
    parent_id: Option<i64>,
    slug: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM categories WHERE parent_id IS ? AND slug = ? AND id != ?",
    )
    .bind(parent_id)
    .bind(slug)
    .bind(exclude_id.unwrap_or(0))
    .fetch_one(pool)
    .await
    .context("Failed to check category slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        parent_id: row.get("parent_id"),
        sort_order: row.get("sort_order"),
        is_public: row.get("is_public"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, slug, description, parent_id, sort_order, is_public, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(&category.description)
    .bind(category.parent_id)
    .bind(category.sort_order)
    .bind(category.is_public)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        created_at: now,
        ..category.clone()
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories c WHERE c.id = ?", CATEGORY_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_mysql).transpose()
}

async fn get_child_by_slug_mysql(
    pool: &MySqlPool,
    parent_id: Option<i64>,
    slug: &str,
) -> Result<Option<Category>> {
    // `<=>` is MySQL's NULL-safe equality.
    let sql = format!(
        "SELECT {} FROM categories c WHERE c.parent_id <=> ? AND c.slug = ?",
        CATEGORY_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(parent_id)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    row.as_ref().map(row_to_category_mysql).transpose()
}

async fn list_roots_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories c WHERE c.parent_id IS NULL ORDER BY c.sort_order, c.name",
        CATEGORY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list root categories")?;

    rows.iter().map(row_to_category_mysql).collect()
}

async fn get_children_mysql(pool: &MySqlPool, parent_id: i64) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories c WHERE c.parent_id = ? ORDER BY c.sort_order, c.name",
        CATEGORY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(parent_id)
        .fetch_all(pool)
        .await
        .context("Failed to get children categories")?;

    rows.iter().map(row_to_category_mysql).collect()
}

async fn get_ancestors_mysql(pool: &MySqlPool, id: i64) -> Result<Vec<Category>> {
    let sql = format!(
        r#"
        WITH RECURSIVE ancestors(id, parent_id, depth) AS (
            SELECT id, parent_id, 0 FROM categories WHERE id = ?
            UNION ALL
            SELECT p.id, p.parent_id, a.depth + 1
            FROM categories p
            INNER JOIN ancestors a ON p.id = a.parent_id
        )
        SELECT {}
        FROM categories c
        INNER JOIN ancestors a ON c.id = a.id
        ORDER BY a.depth DESC
        "#,
        CATEGORY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(id)
        .fetch_all(pool)
        .await
        .context("Failed to get category ancestors")?;

    rows.iter().map(row_to_category_mysql).collect()
}

async fn get_all_descendants_mysql(pool: &MySqlPool, id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query(
        r#"
        WITH RECURSIVE descendants AS (
            SELECT id FROM categories WHERE id = ?
            UNION ALL
            SELECT c.id
            FROM categories c
            INNER JOIN descendants d ON c.parent_id = d.id
        )
        SELECT id FROM descendants
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .context("Failed to get all descendants")?;

    Ok(rows.iter().map(|row| row.get("id")).collect())
}

async fn list_for_product_mysql(pool: &MySqlPool, product_id: i64) -> Result<Vec<Category>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM categories c
        INNER JOIN product_categories pc ON pc.category_id = c.id
        WHERE pc.product_id = ?
        ORDER BY c.sort_order, c.name
        "#,
        CATEGORY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(product_id)
        .fetch_all(pool)
        .await
        .context("Failed to list product categories")?;

    rows.iter().map(row_to_category_mysql).collect()
}

async fn update_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    sqlx::query(
        r#"
        UPDATE categories
        SET name = ?, slug = ?, description = ?, parent_id = ?, sort_order = ?, is_public = ?
        WHERE id = ?
        "#,
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(&category.description)
    .bind(category.parent_id)
    .bind(category.sort_order)
    .bind(category.is_public)
    .bind(category.id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    get_category_by_id_mysql(pool, category.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

async fn delete_category_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn exists_sibling_slug_mysql(
    pool: &MySqlPool,
    parent_id: Option<i64>,
    slug: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM categories WHERE parent_id <=> ? AND slug = ? AND id != ?",
    )
    .bind(parent_id)
    .bind(slug)
    .bind(exclude_id.unwrap_or(0))
    .fetch_one(pool)
    .await
    .context("Failed to check category slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        parent_id: row.get("parent_id"),
        sort_order: row.get("sort_order"),
        is_public: row.get("is_public"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCategoryRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_and_get_category() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo
            .create(&Category::new("Clothing", "clothing", None))
            .await
            .expect("Failed to create category");

        assert!(created.id > 0);
        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.slug, "clothing");
        assert!(found.is_public);
        assert!(repo.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_child_by_slug_scoped_to_parent() {
        let (_pool, repo) = setup_test_repo().await;

        let clothing = repo.create(&Category::new("Clothing", "clothing", None)).await.unwrap();
        let books = repo.create(&Category::new("Books", "books", None)).await.unwrap();
        let sale_clothing = repo
            .create(&Category::new("Sale", "sale", Some(clothing.id)))
            .await
            .unwrap();
        let sale_books = repo
            .create(&Category::new("Sale", "sale", Some(books.id)))
            .await
            .unwrap();

        let root = repo.get_child_by_slug(None, "clothing").await.unwrap().unwrap();
        assert_eq!(root.id, clothing.id);

        let found = repo
            .get_child_by_slug(Some(books.id), "sale")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, sale_books.id);
        assert_ne!(found.id, sale_clothing.id);

        assert!(repo.get_child_by_slug(None, "sale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_roots_and_children_ordering() {
        let (_pool, repo) = setup_test_repo().await;

        let mut b = Category::new("B", "b", None);
        b.sort_order = 1;
        let b = repo.create(&b).await.unwrap();
        repo.create(&Category::new("A", "a", None)).await.unwrap();
        repo.create(&Category::new("Inner", "inner", Some(b.id))).await.unwrap();

        let roots = repo.list_roots().await.unwrap();
        assert_eq!(roots.iter().map(|c| c.slug.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);

        let children = repo.get_children(b.id).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].slug, "inner");
    }

    #[tokio::test]
    async fn test_ancestors_root_first() {
        let (_pool, repo) = setup_test_repo().await;

        let a = repo.create(&Category::new("A", "a", None)).await.unwrap();
        let b = repo.create(&Category::new("B", "b", Some(a.id))).await.unwrap();
        let c = repo.create(&Category::new("C", "c", Some(b.id))).await.unwrap();

        let path = repo.get_ancestors(c.id).await.unwrap();
        assert_eq!(path.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a.id, b.id, c.id]);
        assert!(repo.get_ancestors(9999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_subtree() {
        let (_pool, repo) = setup_test_repo().await;

        let a = repo.create(&Category::new("A", "a", None)).await.unwrap();
        let b = repo.create(&Category::new("B", "b", Some(a.id))).await.unwrap();
        let c = repo.create(&Category::new("C", "c", Some(b.id))).await.unwrap();

        let descendants = repo.get_all_descendants(a.id).await.unwrap();
        assert_eq!(descendants.len(), 3);

        repo.delete(a.id).await.unwrap();
        assert!(repo.get_by_id(b.id).await.unwrap().is_none());
        assert!(repo.get_by_id(c.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_sibling_slug() {
        let (_pool, repo) = setup_test_repo().await;

        let a = repo.create(&Category::new("A", "a", None)).await.unwrap();
        let child = repo.create(&Category::new("X", "x", Some(a.id))).await.unwrap();

        assert!(repo.exists_sibling_slug(None, "a", None).await.unwrap());
        assert!(!repo.exists_sibling_slug(None, "x", None).await.unwrap());
        assert!(repo.exists_sibling_slug(Some(a.id), "x", None).await.unwrap());
        assert!(!repo
            .exists_sibling_slug(Some(a.id), "x", Some(child.id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_update_category() {
        let (_pool, repo) = setup_test_repo().await;

        let mut category = repo.create(&Category::new("Old", "old", None)).await.unwrap();
        category.name = "New".to_string();
        category.is_public = false;

        let updated = repo.update(&category).await.unwrap();
        assert_eq!(updated.name, "New");
        assert!(!updated.is_public);
    }
}
