//! Category service
//!
//! Implements business logic for the category tree:
//! - Create, read, update, delete categories
//! - Slug generation from name, slugs unique among siblings
//! - Resolving a `/`-separated slug path from the root
//! - Breadcrumbs for product detail
//!
//! Root listings and resolved paths are cached and dropped on every write.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::CategoryRepository;
use crate::models::{
    breadcrumbs, full_slug, split_slug_path, Category, CreateCategoryInput, UpdateCategoryInput,
};
use anyhow::Context;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default cache TTL for categories (1 hour)
const CATEGORY_CACHE_TTL_SECS: u64 = 3600;

/// Cache key prefixes
const CACHE_KEY_ALL: &str = "categories:*";
const CACHE_KEY_ROOTS: &str = "categories:roots";
const CACHE_KEY_PATH: &str = "categories:path:";

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// A sibling already uses this slug
    #[error("Category slug already exists: {0}")]
    DuplicateSlug(String),

    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Parent category not found
    #[error("Parent category not found: {0}")]
    ParentNotFound(i64),

    /// Circular reference detected
    #[error("Circular reference detected: category cannot be its own ancestor")]
    CircularReference,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service for managing the catalogue tree
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
    /// Bumped on every write; a load that straddles a write is not cached
    generation: AtomicU64,
}

impl CategoryService {
    /// Create a new category service
    pub fn new(repo: Arc<dyn CategoryRepository>, cache: Arc<Cache>) -> Self {
        Self::with_cache_ttl(repo, cache, Duration::from_secs(CATEGORY_CACHE_TTL_SECS))
    }

    /// Create a new category service with custom cache TTL
    pub fn with_cache_ttl(
        repo: Arc<dyn CategoryRepository>,
        cache: Arc<Cache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            cache,
            cache_ttl,
            generation: AtomicU64::new(0),
        }
    }

    /// Create a new category
    ///
    /// # Errors
    /// - `ValidationError` if the name is empty or no slug can be derived
    /// - `ParentNotFound` if the specified parent category doesn't exist
    /// - `DuplicateSlug` if a sibling already uses the slug
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(CategoryServiceError::ValidationError(
                "Category name cannot be empty".to_string(),
            ));
        }

        let slug = match input.slug {
            Some(slug) => validate_slug(&slug)?,
            None => generate_slug(&name),
        };
        if slug.is_empty() {
            return Err(CategoryServiceError::ValidationError(
                "Category slug cannot be empty".to_string(),
            ));
        }

        if let Some(parent_id) = input.parent_id {
            if self.repo.get_by_id(parent_id).await.context("Failed to get parent category")?.is_none() {
                return Err(CategoryServiceError::ParentNotFound(parent_id));
            }
        }

        if self
            .repo
            .exists_sibling_slug(input.parent_id, &slug, None)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(CategoryServiceError::DuplicateSlug(slug));
        }

        let mut category = Category::new(name, slug, input.parent_id);
        category.description = input.description;
        category.sort_order = input.sort_order.unwrap_or(0);
        category.is_public = input.is_public.unwrap_or(true);

        let created = self.repo.create(&category).await.context("Failed to create category")?;
        tracing::info!(id = created.id, slug = %created.slug, "Created category");

        self.invalidate_cache().await;
        Ok(created)
    }

    /// Get category by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Category>, CategoryServiceError> {
        self.repo.get_by_id(id).await.context("Failed to get category by ID").map_err(Into::into)
    }

    /// Root categories, ordered by sort order then name
    pub async fn list_roots(&self) -> Result<Vec<Category>, CategoryServiceError> {
        if let Some(roots) = self.cache.get::<Vec<Category>>(CACHE_KEY_ROOTS).await.ok().flatten() {
            return Ok(roots);
        }
        tracing::debug!("Category roots cache miss");

        let generation = self.generation.load(Ordering::SeqCst);
        let roots = self.repo.list_roots().await.context("Failed to list root categories")?;
        self.store(CACHE_KEY_ROOTS, &roots, generation).await;

        Ok(roots)
    }

    /// Direct children of a category
    pub async fn get_children(&self, id: i64) -> Result<Vec<Category>, CategoryServiceError> {
        self.repo.get_children(id).await.context("Failed to get child categories").map_err(Into::into)
    }

    /// Resolve a slug path such as `books/fiction` from the root.
    ///
    /// # Errors
    /// - `NotFound` if the path is empty or any segment does not resolve
    pub async fn find_by_path(&self, path: &str) -> Result<Category, CategoryServiceError> {
        let segments = split_slug_path(path);
        if segments.is_empty() {
            return Err(CategoryServiceError::NotFound("empty category path".to_string()));
        }

        let cache_key = format!("{}{}", CACHE_KEY_PATH, segments.join("/"));
        if let Some(category) = self.cache.get::<Category>(&cache_key).await.ok().flatten() {
            return Ok(category);
        }
        tracing::debug!(path = %path, "Category path cache miss");

        let generation = self.generation.load(Ordering::SeqCst);
        let mut current: Option<Category> = None;
        for segment in &segments {
            let parent_id = current.as_ref().map(|c| c.id);
            let next = self
                .repo
                .get_child_by_slug(parent_id, segment)
                .await
                .context("Failed to resolve category path")?
                .ok_or_else(|| {
                    CategoryServiceError::NotFound(format!("No category at path '{}'", path))
                })?;
            current = Some(next);
        }

        let category = current.ok_or_else(|| {
            CategoryServiceError::NotFound(format!("No category at path '{}'", path))
        })?;
        self.store(&cache_key, &category, generation).await;

        Ok(category)
    }

    /// Children of the category found at `path`. An empty path lists the roots.
    pub async fn list_by_path(&self, path: &str) -> Result<Vec<Category>, CategoryServiceError> {
        if split_slug_path(path).is_empty() {
            return self.list_roots().await;
        }
        let category = self.find_by_path(path).await?;
        self.get_children(category.id).await
    }

    /// Ancestors of a category, root first, ending with the category itself
    pub async fn get_ancestors(&self, id: i64) -> Result<Vec<Category>, CategoryServiceError> {
        self.repo.get_ancestors(id).await.context("Failed to get category ancestors").map_err(Into::into)
    }

    /// Breadcrumb trail such as `Books > Fiction`
    pub async fn breadcrumbs(&self, id: i64) -> Result<String, CategoryServiceError> {
        Ok(breadcrumbs(&self.get_ancestors(id).await?))
    }

    /// Full slug path such as `books/fiction`
    pub async fn full_slug(&self, id: i64) -> Result<String, CategoryServiceError> {
        Ok(full_slug(&self.get_ancestors(id).await?))
    }

    /// Categories a product is linked to
    pub async fn list_for_product(&self, product_id: i64) -> Result<Vec<Category>, CategoryServiceError> {
        self.repo
            .list_for_product(product_id)
            .await
            .context("Failed to get product categories")
            .map_err(Into::into)
    }

    /// Update a category
    ///
    /// # Errors
    /// - `NotFound` if the category doesn't exist
    /// - `ValidationError` for an empty name or slug
    /// - `ParentNotFound` if the new parent doesn't exist
    /// - `CircularReference` if the new parent would create a cycle
    /// - `DuplicateSlug` if a sibling under the (new) parent uses the slug
    pub async fn update(&self, id: i64, input: UpdateCategoryInput) -> Result<Category, CategoryServiceError> {
        let mut category = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| CategoryServiceError::NotFound(format!("Category with ID {} not found", id)))?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CategoryServiceError::ValidationError(
                    "Category name cannot be empty".to_string(),
                ));
            }
            category.name = name;
        }

        if let Some(slug) = input.slug {
            category.slug = validate_slug(&slug)?;
        }

        if let Some(description) = input.description {
            category.description = description;
        }

        if let Some(new_parent_id) = input.parent_id {
            if let Some(parent_id) = new_parent_id {
                if self.would_create_cycle(id, parent_id).await? {
                    return Err(CategoryServiceError::CircularReference);
                }
                if self.repo.get_by_id(parent_id).await.context("Failed to get parent category")?.is_none() {
                    return Err(CategoryServiceError::ParentNotFound(parent_id));
                }
            }
            category.parent_id = new_parent_id;
        }

        if let Some(sort_order) = input.sort_order {
            category.sort_order = sort_order;
        }

        if let Some(is_public) = input.is_public {
            category.is_public = is_public;
        }

        if self
            .repo
            .exists_sibling_slug(category.parent_id, &category.slug, Some(id))
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(CategoryServiceError::DuplicateSlug(category.slug));
        }

        let updated = self.repo.update(&category).await.context("Failed to update category")?;
        tracing::info!(id = updated.id, "Updated category");

        self.invalidate_cache().await;
        Ok(updated)
    }

    /// Delete a category together with its subtree
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        if self.repo.get_by_id(id).await.context("Failed to get category")?.is_none() {
            return Err(CategoryServiceError::NotFound(format!("Category with ID {} not found", id)));
        }

        self.repo.delete(id).await.context("Failed to delete category")?;
        tracing::info!(id, "Deleted category");

        self.invalidate_cache().await;
        Ok(())
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    /// Check if setting parent_id would create a circular reference
    async fn would_create_cycle(&self, category_id: i64, new_parent_id: i64) -> Result<bool, CategoryServiceError> {
        if category_id == new_parent_id {
            return Ok(true);
        }

        let descendants = self
            .repo
            .get_all_descendants(category_id)
            .await
            .context("Failed to get descendants")?;

        Ok(descendants.contains(&new_parent_id))
    }

    /// Cache a value loaded under `generation`.
    ///
    /// A write that lands between the load and the insert bumps the
    /// generation, so the entry is dropped again instead of outliving it.
    async fn store<T>(&self, key: &str, value: &T, generation: u64)
    where
        T: serde::Serialize + Send + Sync,
    {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        let _ = self.cache.set(key, value, self.cache_ttl).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            let _ = self.cache.delete(key).await;
        }
    }

    async fn invalidate_cache(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.cache.delete_pattern(CACHE_KEY_ALL).await;
    }
}

fn validate_slug(slug: &str) -> Result<String, CategoryServiceError> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Category slug cannot be empty".to_string(),
        ));
    }
    if slug.contains('/') {
        return Err(CategoryServiceError::ValidationError(
            "Category slug cannot contain '/'".to_string(),
        ));
    }
    Ok(slug.to_string())
}

/// Generate a URL-friendly slug from a name
///
/// - Converts to lowercase
/// - Replaces spaces and special characters with hyphens
/// - Removes consecutive hyphens
/// - Keeps non-ASCII letters
pub fn generate_slug(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || (!c.is_ascii() && c.is_alphanumeric()) {
                c
            } else {
                '-'
            }
        })
        .collect();

    let mut result = String::with_capacity(slug.len());
    let mut prev_hyphen = false;

    for c in slug.chars() {
        if c == '-' {
            if !prev_hyphen && !result.is_empty() {
                result.push(c);
                prev_hyphen = true;
            }
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    result.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use proptest::prelude::*;

    async fn setup_test_service() -> (DynDatabasePool, CategoryService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let repo = SqlxCategoryRepository::boxed(pool.clone());
        let cache = create_cache(&CacheConfig::default());
        let service = CategoryService::new(repo, cache);

        (pool, service)
    }

    // ========================================================================
    // Slug generation tests
    // ========================================================================

    #[test]
    fn test_generate_slug_simple() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
    }

    #[test]
    fn test_generate_slug_with_special_chars() {
        assert_eq!(generate_slug("Books & Games!"), "books-games");
    }

    #[test]
    fn test_generate_slug_with_underscores_and_spaces() {
        assert_eq!(generate_slug("  kids__toys  "), "kids-toys");
    }

    #[test]
    fn test_generate_slug_keeps_non_ascii_letters() {
        assert_eq!(generate_slug("Café Crème"), "café-crème");
    }

    proptest! {
        #[test]
        fn slug_has_no_edge_or_double_hyphens(name in "[A-Za-z0-9 _!&-]{0,40}") {
            let slug = generate_slug(&name);
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert!(!slug.contains('/'));
        }
    }

    // ========================================================================
    // Service tests
    // ========================================================================

    #[tokio::test]
    async fn test_create_and_get() {
        let (_pool, service) = setup_test_service().await;

        let created = service.create(CreateCategoryInput::new("Books")).await.unwrap();
        assert_eq!(created.slug, "books");
        assert!(created.is_root());

        let found = service.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Books");
    }

    #[tokio::test]
    async fn test_create_rejects_empty_name() {
        let (_pool, service) = setup_test_service().await;
        let result = service.create(CreateCategoryInput::new("   ")).await;
        assert!(matches!(result, Err(CategoryServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_with_missing_parent() {
        let (_pool, service) = setup_test_service().await;
        let result = service.create(CreateCategoryInput::new("Orphan").with_parent(999)).await;
        assert!(matches!(result, Err(CategoryServiceError::ParentNotFound(999))));
    }

    #[tokio::test]
    async fn test_slug_unique_among_siblings_only() {
        let (_pool, service) = setup_test_service().await;

        let books = service.create(CreateCategoryInput::new("Books")).await.unwrap();
        let games = service.create(CreateCategoryInput::new("Games")).await.unwrap();

        service
            .create(CreateCategoryInput::new("Fiction").with_parent(books.id))
            .await
            .unwrap();
        // Same slug under a different parent is fine
        service
            .create(CreateCategoryInput::new("Fiction").with_parent(games.id))
            .await
            .unwrap();

        let duplicate = service
            .create(CreateCategoryInput::new("Fiction!").with_parent(books.id))
            .await;
        assert!(matches!(duplicate, Err(CategoryServiceError::DuplicateSlug(_))));
    }

    #[tokio::test]
    async fn test_find_and_list_by_path() {
        let (_pool, service) = setup_test_service().await;

        let books = service.create(CreateCategoryInput::new("Books")).await.unwrap();
        let fiction = service
            .create(CreateCategoryInput::new("Fiction").with_parent(books.id))
            .await
            .unwrap();
        service
            .create(CreateCategoryInput::new("Horror").with_parent(fiction.id))
            .await
            .unwrap();
        service
            .create(CreateCategoryInput::new("Sci-Fi").with_parent(fiction.id))
            .await
            .unwrap();

        let found = service.find_by_path("books/fiction").await.unwrap();
        assert_eq!(found.id, fiction.id);

        // Trailing and doubled separators are ignored
        let found = service.find_by_path("/books//fiction/").await.unwrap();
        assert_eq!(found.id, fiction.id);

        let children = service.list_by_path("books/fiction").await.unwrap();
        let slugs: Vec<&str> = children.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["horror", "sci-fi"]);

        assert!(matches!(
            service.find_by_path("books/poetry").await,
            Err(CategoryServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.find_by_path("fiction").await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_breadcrumbs_and_full_slug() {
        let (_pool, service) = setup_test_service().await;

        let books = service.create(CreateCategoryInput::new("Books")).await.unwrap();
        let fiction = service
            .create(CreateCategoryInput::new("Fiction").with_parent(books.id))
            .await
            .unwrap();

        assert_eq!(service.breadcrumbs(fiction.id).await.unwrap(), "Books > Fiction");
        assert_eq!(service.full_slug(fiction.id).await.unwrap(), "books/fiction");
    }

    #[tokio::test]
    async fn test_roots_cache_is_invalidated_on_write() {
        let (_pool, service) = setup_test_service().await;

        service.create(CreateCategoryInput::new("Books")).await.unwrap();
        assert_eq!(service.list_roots().await.unwrap().len(), 1);

        service.create(CreateCategoryInput::new("Games")).await.unwrap();
        assert_eq!(service.list_roots().await.unwrap().len(), 2);
    }

    /// Holds the first `list_roots` result back so a write can land before it is cached.
    struct SlowRootsRepository {
        inner: Arc<dyn CategoryRepository>,
        delayed: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl CategoryRepository for SlowRootsRepository {
        async fn create(&self, category: &Category) -> anyhow::Result<Category> {
            self.inner.create(category).await
        }
        async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<Category>> {
            self.inner.get_by_id(id).await
        }
        async fn get_child_by_slug(
            &self,
            parent_id: Option<i64>,
            slug: &str,
        ) -> anyhow::Result<Option<Category>> {
            self.inner.get_child_by_slug(parent_id, slug).await
        }
        async fn list_roots(&self) -> anyhow::Result<Vec<Category>> {
            let roots = self.inner.list_roots().await?;
            if !self.delayed.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Ok(roots)
        }
        async fn get_children(&self, parent_id: i64) -> anyhow::Result<Vec<Category>> {
            self.inner.get_children(parent_id).await
        }
        async fn get_ancestors(&self, id: i64) -> anyhow::Result<Vec<Category>> {
            self.inner.get_ancestors(id).await
        }
        async fn get_all_descendants(&self, id: i64) -> anyhow::Result<Vec<i64>> {
            self.inner.get_all_descendants(id).await
        }
        async fn list_for_product(&self, product_id: i64) -> anyhow::Result<Vec<Category>> {
            self.inner.list_for_product(product_id).await
        }
        async fn update(&self, category: &Category) -> anyhow::Result<Category> {
            self.inner.update(category).await
        }
        async fn delete(&self, id: i64) -> anyhow::Result<()> {
            self.inner.delete(id).await
        }
        async fn exists_sibling_slug(
            &self,
            parent_id: Option<i64>,
            slug: &str,
            exclude_id: Option<i64>,
        ) -> anyhow::Result<bool> {
            self.inner.exists_sibling_slug(parent_id, slug, exclude_id).await
        }
    }

    #[tokio::test]
    async fn test_roots_loaded_before_a_write_are_not_cached() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let repo = Arc::new(SlowRootsRepository {
            inner: SqlxCategoryRepository::boxed(pool.clone()),
            delayed: std::sync::atomic::AtomicBool::new(false),
        });
        let service = Arc::new(CategoryService::new(repo, create_cache(&CacheConfig::default())));

        let reader = {
            let service = service.clone();
            tokio::spawn(async move { service.list_roots().await })
        };
        // Let the reader load the empty table and park in the delay
        tokio::time::sleep(Duration::from_millis(50)).await;
        service.create(CreateCategoryInput::new("Books")).await.unwrap();

        let stale = reader.await.unwrap().unwrap();
        assert!(stale.is_empty());

        let roots = service.list_roots().await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].slug, "books");
    }

    #[tokio::test]
    async fn test_path_cache_is_invalidated_on_rename() {
        let (_pool, service) = setup_test_service().await;

        let books = service.create(CreateCategoryInput::new("Books")).await.unwrap();
        service.find_by_path("books").await.unwrap();

        let input = UpdateCategoryInput {
            slug: Some("novels".to_string()),
            ..Default::default()
        };
        service.update(books.id, input).await.unwrap();

        assert!(service.find_by_path("books").await.is_err());
        assert_eq!(service.find_by_path("novels").await.unwrap().id, books.id);
    }

    #[tokio::test]
    async fn test_update_rejects_cycle() {
        let (_pool, service) = setup_test_service().await;

        let root = service.create(CreateCategoryInput::new("Root")).await.unwrap();
        let child = service
            .create(CreateCategoryInput::new("Child").with_parent(root.id))
            .await
            .unwrap();

        let to_self = UpdateCategoryInput {
            parent_id: Some(Some(root.id)),
            ..Default::default()
        };
        assert!(matches!(
            service.update(root.id, to_self).await,
            Err(CategoryServiceError::CircularReference)
        ));

        let to_child = UpdateCategoryInput {
            parent_id: Some(Some(child.id)),
            ..Default::default()
        };
        assert!(matches!(
            service.update(root.id, to_child).await,
            Err(CategoryServiceError::CircularReference)
        ));
    }

    #[tokio::test]
    async fn test_move_to_root() {
        let (_pool, service) = setup_test_service().await;

        let root = service.create(CreateCategoryInput::new("Root")).await.unwrap();
        let child = service
            .create(CreateCategoryInput::new("Child").with_parent(root.id))
            .await
            .unwrap();

        let input = UpdateCategoryInput {
            parent_id: Some(None),
            ..Default::default()
        };
        let moved = service.update(child.id, input).await.unwrap();
        assert!(moved.is_root());
        assert_eq!(service.list_roots().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_category() {
        let (_pool, service) = setup_test_service().await;
        let result = service.update(42, UpdateCategoryInput::default()).await;
        assert!(matches!(result, Err(CategoryServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_subtree() {
        let (_pool, service) = setup_test_service().await;

        let books = service.create(CreateCategoryInput::new("Books")).await.unwrap();
        let fiction = service
            .create(CreateCategoryInput::new("Fiction").with_parent(books.id))
            .await
            .unwrap();

        service.delete(books.id).await.unwrap();
        assert!(service.get_by_id(books.id).await.unwrap().is_none());
        assert!(service.get_by_id(fiction.id).await.unwrap().is_none());

        assert!(matches!(
            service.delete(books.id).await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }
}
