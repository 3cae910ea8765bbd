//! Product service
//!
//! Implements business logic for products:
//! - Create, read, update, delete products
//! - Structure rules for standalone, parent and child products
//! - UPC uniqueness
//! - Category links
//! - Composing the detail view (attributes, categories, images, children)

use crate::db::repositories::{
    AttributeValueRepository, CategoryRepository, ImageRepository, ProductRepository,
    StockRecordRepository,
};
use crate::models::{
    breadcrumbs, CreateProductInput, ListParams, PagedResult, Product, ProductCategorySummary,
    ProductDetail, ProductStructure, UpdateProductInput,
};
use crate::db::is_unique_violation;
use crate::services::category::generate_slug;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Slug used when a product has no title to derive one from
const FALLBACK_SLUG: &str = "product";

/// Error types for product service operations
#[derive(Debug, thiserror::Error)]
pub enum ProductServiceError {
    /// Product not found
    #[error("Product not found: {0}")]
    NotFound(String),

    /// Another product already uses this UPC
    #[error("UPC already exists: {0}")]
    DuplicateUpc(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Product service
pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    value_repo: Arc<dyn AttributeValueRepository>,
    image_repo: Arc<dyn ImageRepository>,
    stock_repo: Arc<dyn StockRecordRepository>,
}

impl ProductService {
    pub fn new(
        repo: Arc<dyn ProductRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        value_repo: Arc<dyn AttributeValueRepository>,
        image_repo: Arc<dyn ImageRepository>,
        stock_repo: Arc<dyn StockRecordRepository>,
    ) -> Self {
        Self {
            repo,
            category_repo,
            value_repo,
            image_repo,
            stock_repo,
        }
    }

    /// Create a new product
    ///
    /// # Errors
    /// - `ValidationError` if the structure rules are broken or a category is unknown
    /// - `DuplicateUpc` if the UPC is already taken
    pub async fn create(&self, input: CreateProductInput) -> Result<Product, ProductServiceError> {
        let now = Utc::now();
        let mut product = Product {
            id: 0,
            structure: input.structure,
            upc: normalize_optional(input.upc),
            parent_id: input.parent_id,
            title: normalize_optional(input.title),
            slug: String::new(),
            description: input.description,
            is_public: input.is_public,
            date_created: now,
            date_updated: now,
        };

        let parent = self.validate_structure(&product, &input.category_ids).await?;
        self.check_upc(product.upc.as_deref(), None).await?;
        self.check_categories(&input.category_ids).await?;

        product.slug = match input.slug {
            Some(slug) => validate_slug(&slug)?,
            None => slug_for(&product, parent.as_ref()),
        };

        let created = self
            .repo
            .create(&product, &input.category_ids)
            .await
            .map_err(|e| write_error(e, &product, "Failed to create product"))?;

        tracing::info!(id = created.id, structure = %created.structure, "Created product");
        Ok(created)
    }

    /// Get product by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Product>, ProductServiceError> {
        self.repo.get_by_id(id).await.context("Failed to get product by ID").map_err(Into::into)
    }

    /// Get a product or fail with `NotFound`
    pub async fn require(&self, id: i64) -> Result<Product, ProductServiceError> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| ProductServiceError::NotFound(format!("Product with ID {} not found", id)))
    }

    /// List products, optionally only those with one structure.
    ///
    /// An unrecognised structure matches nothing.
    pub async fn list(
        &self,
        structure: Option<&str>,
        params: &ListParams,
    ) -> Result<PagedResult<Product>, ProductServiceError> {
        let structure = match structure {
            Some(value) => match ProductStructure::from_str(value) {
                Some(structure) => Some(structure),
                None => return Ok(PagedResult::empty(params)),
            },
            None => None,
        };

        let items = self
            .repo
            .list(structure, params.offset(), params.limit())
            .await
            .context("Failed to list products")?;
        let total = self.repo.count(structure).await.context("Failed to count products")?;

        Ok(PagedResult::new(items, total, params))
    }

    /// Children of a parent product
    pub async fn list_children(&self, id: i64) -> Result<Vec<Product>, ProductServiceError> {
        self.repo.list_children(id).await.context("Failed to list child products").map_err(Into::into)
    }

    /// Full representation of a product
    pub async fn get_detail(&self, id: i64) -> Result<Option<ProductDetail>, ProductServiceError> {
        let product = match self.get_by_id(id).await? {
            Some(product) => product,
            None => return Ok(None),
        };

        let parent = match product.parent_id {
            Some(parent_id) => self.get_by_id(parent_id).await?,
            None => None,
        };

        let attributes = self
            .value_repo
            .list_summaries(id)
            .await
            .context("Failed to get product attributes")?;

        let mut categories = Vec::new();
        for category in self
            .category_repo
            .list_for_product(id)
            .await
            .context("Failed to get product categories")?
        {
            let path = self
                .category_repo
                .get_ancestors(category.id)
                .await
                .context("Failed to get category ancestors")?;
            categories.push(ProductCategorySummary {
                breadcrumbs: breadcrumbs(&path),
                category,
            });
        }

        let images = self.image_repo.list(Some(id)).await.context("Failed to get product images")?;

        let children = if product.is_parent() {
            self.list_children(id).await?.into_iter().map(|child| child.id).collect()
        } else {
            Vec::new()
        };

        Ok(Some(ProductDetail {
            display_title: product.display_title(parent.as_ref()),
            product,
            attributes,
            categories,
            images,
            children,
        }))
    }

    /// Update a product
    ///
    /// # Errors
    /// - `NotFound` if the product doesn't exist
    /// - `ValidationError` if the result breaks the structure rules
    /// - `DuplicateUpc` if the new UPC is already taken
    pub async fn update(&self, id: i64, input: UpdateProductInput) -> Result<Product, ProductServiceError> {
        let mut product = self.require(id).await?;

        if let Some(structure) = input.structure {
            product.structure = structure;
        }
        if let Some(upc) = input.upc {
            product.upc = normalize_optional(upc);
        }
        if let Some(parent_id) = input.parent_id {
            product.parent_id = parent_id;
        }
        if let Some(title) = input.title {
            product.title = normalize_optional(title);
        }
        if let Some(description) = input.description {
            product.description = description;
        }
        if let Some(is_public) = input.is_public {
            product.is_public = is_public;
        }
        if let Some(slug) = input.slug {
            product.slug = validate_slug(&slug)?;
        }

        let category_ids = match input.category_ids {
            Some(ref ids) => ids.clone(),
            None => self.repo.get_category_ids(id).await.context("Failed to get product categories")?,
        };

        self.validate_structure(&product, &category_ids).await?;
        self.check_upc(product.upc.as_deref(), Some(id)).await?;
        if input.category_ids.is_some() {
            self.check_categories(&category_ids).await?;
        }

        if !product.is_parent() && !self.list_children(id).await?.is_empty() {
            return Err(ProductServiceError::ValidationError(
                "A product with children must keep the parent structure".to_string(),
            ));
        }
        if product.is_parent()
            && !self
                .stock_repo
                .list_for_product(id)
                .await
                .context("Failed to get stock records")?
                .is_empty()
        {
            return Err(ProductServiceError::ValidationError(
                "A parent product can't have stock records".to_string(),
            ));
        }

        let links = input.category_ids.as_ref().map(|_| category_ids.as_slice());
        let updated = self
            .repo
            .update(&product, links)
            .await
            .map_err(|e| write_error(e, &product, "Failed to update product"))?;

        tracing::info!(id, "Updated product");
        Ok(updated)
    }

    /// Delete a product along with its children and everything it owns
    pub async fn delete(&self, id: i64) -> Result<(), ProductServiceError> {
        self.require(id).await?;
        self.repo.delete(id).await.context("Failed to delete product")?;
        tracing::info!(id, "Deleted product");
        Ok(())
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    /// Check the structure rules, returning the parent of a child product
    async fn validate_structure(
        &self,
        product: &Product,
        category_ids: &[i64],
    ) -> Result<Option<Product>, ProductServiceError> {
        match product.structure {
            ProductStructure::Standalone | ProductStructure::Parent => {
                if product.title.is_none() {
                    return Err(ProductServiceError::ValidationError(format!(
                        "A {} product needs a title",
                        product.structure
                    )));
                }
                if product.parent_id.is_some() {
                    return Err(ProductServiceError::ValidationError(
                        "Only child products can have a parent".to_string(),
                    ));
                }
                Ok(None)
            }
            ProductStructure::Child => {
                let parent_id = product.parent_id.ok_or_else(|| {
                    ProductServiceError::ValidationError(
                        "A child product needs a parent".to_string(),
                    )
                })?;
                if parent_id == product.id {
                    return Err(ProductServiceError::ValidationError(
                        "A product can't be its own parent".to_string(),
                    ));
                }

                let parent = self
                    .repo
                    .get_by_id(parent_id)
                    .await
                    .context("Failed to get parent product")?
                    .ok_or_else(|| {
                        ProductServiceError::ValidationError(format!(
                            "Parent product {} does not exist",
                            parent_id
                        ))
                    })?;
                if !parent.is_parent() {
                    return Err(ProductServiceError::ValidationError(format!(
                        "Product {} is not a parent product",
                        parent_id
                    )));
                }
                if !category_ids.is_empty() {
                    return Err(ProductServiceError::ValidationError(
                        "A child product can't belong to categories".to_string(),
                    ));
                }
                Ok(Some(parent))
            }
        }
    }

    async fn check_upc(&self, upc: Option<&str>, exclude_id: Option<i64>) -> Result<(), ProductServiceError> {
        let upc = match upc {
            Some(upc) => upc,
            None => return Ok(()),
        };

        let existing = self.repo.get_by_upc(upc).await.context("Failed to check UPC uniqueness")?;
        match existing {
            Some(other) if Some(other.id) != exclude_id => {
                Err(ProductServiceError::DuplicateUpc(upc.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn check_categories(&self, category_ids: &[i64]) -> Result<(), ProductServiceError> {
        for category_id in category_ids {
            if self
                .category_repo
                .get_by_id(*category_id)
                .await
                .context("Failed to get category")?
                .is_none()
            {
                return Err(ProductServiceError::ValidationError(format!(
                    "Category {} does not exist",
                    category_id
                )));
            }
        }
        Ok(())
    }
}

/// A UNIQUE violation on write means another request took the UPC first
fn write_error(
    err: anyhow::Error,
    product: &Product,
    context: &'static str,
) -> ProductServiceError {
    match &product.upc {
        Some(upc) if is_unique_violation(&err) => ProductServiceError::DuplicateUpc(upc.clone()),
        _ => ProductServiceError::InternalError(err.context(context)),
    }
}

/// Trim a text field, treating blank as absent
fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_slug(slug: &str) -> Result<String, ProductServiceError> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(ProductServiceError::ValidationError(
            "Product slug cannot be empty".to_string(),
        ));
    }
    Ok(slug.to_string())
}

/// Slug derived from the display title
fn slug_for(product: &Product, parent: Option<&Product>) -> String {
    let slug = product
        .display_title(parent)
        .map(|title| generate_slug(&title))
        .unwrap_or_default();
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxAttributeValueRepository, SqlxCategoryRepository, SqlxImageRepository,
        SqlxProductRepository, SqlxStockRecordRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{Category, ProductImage, StockRecord};

    async fn setup_test_service() -> (DynDatabasePool, ProductService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = ProductService::new(
            SqlxProductRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            SqlxAttributeValueRepository::boxed(pool.clone()),
            SqlxImageRepository::boxed(pool.clone()),
            SqlxStockRecordRepository::boxed(pool.clone()),
        );

        (pool, service)
    }

    async fn create_category(pool: &DynDatabasePool, name: &str, parent_id: Option<i64>) -> Category {
        SqlxCategoryRepository::new(pool.clone())
            .create(&Category::new(name, generate_slug(name), parent_id))
            .await
            .unwrap()
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  abc ".to_string())), Some("abc".to_string()));
        assert_eq!(normalize_optional(Some("   ".to_string())), None);
        assert_eq!(normalize_optional(None), None);
    }

    #[tokio::test]
    async fn test_create_standalone() {
        let (_pool, service) = setup_test_service().await;

        let product = service
            .create(CreateProductInput::new("Blue Mug").with_upc("123"))
            .await
            .unwrap();
        assert!(product.id > 0);
        assert_eq!(product.slug, "blue-mug");
        assert_eq!(product.structure, ProductStructure::Standalone);
    }

    #[tokio::test]
    async fn test_create_requires_title() {
        let (_pool, service) = setup_test_service().await;
        let result = service.create(CreateProductInput::new("  ")).await;
        assert!(matches!(result, Err(ProductServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_duplicate_upc() {
        let (_pool, service) = setup_test_service().await;

        service.create(CreateProductInput::new("A").with_upc("999")).await.unwrap();
        let result = service.create(CreateProductInput::new("B").with_upc("999")).await;
        assert!(matches!(result, Err(ProductServiceError::DuplicateUpc(_))));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_upc_is_conflict() {
        let (_pool, service) = setup_test_service().await;

        let (a, b) = tokio::join!(
            service.create(CreateProductInput::new("A").with_upc("777")),
            service.create(CreateProductInput::new("B").with_upc("777")),
        );
        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(ProductServiceError::DuplicateUpc(upc)) if upc == "777")));
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_duplicate_upc() {
        let (pool, _service) = setup_test_service().await;
        let repo = SqlxProductRepository::new(pool);

        let product = Product {
            id: 0,
            structure: ProductStructure::Standalone,
            upc: Some("555".to_string()),
            parent_id: None,
            title: Some("Mug".to_string()),
            slug: "mug".to_string(),
            description: String::new(),
            is_public: true,
            date_created: Utc::now(),
            date_updated: Utc::now(),
        };
        repo.create(&product, &[]).await.unwrap();
        let err = repo.create(&product, &[]).await.unwrap_err();

        assert!(matches!(
            write_error(err, &product, "Failed to create product"),
            ProductServiceError::DuplicateUpc(upc) if upc == "555"
        ));
        assert!(matches!(
            write_error(anyhow::anyhow!("disk full"), &product, "Failed to create product"),
            ProductServiceError::InternalError(_)
        ));
    }

    #[tokio::test]
    async fn test_create_with_vanished_category_leaves_nothing_behind() {
        let (pool, service) = setup_test_service().await;
        let books = create_category(&pool, "Books", None).await;

        // The category passes the existence check, then disappears before the write
        let repo = SqlxProductRepository::new(pool.clone());
        let product = Product {
            id: 0,
            structure: ProductStructure::Standalone,
            upc: None,
            parent_id: None,
            title: Some("Novel".to_string()),
            slug: "novel".to_string(),
            description: String::new(),
            is_public: true,
            date_created: Utc::now(),
            date_updated: Utc::now(),
        };
        SqlxCategoryRepository::new(pool.clone()).delete(books.id).await.unwrap();
        assert!(repo.create(&product, &[books.id]).await.is_err());

        let page = service.list(None, &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_child_needs_parent_product() {
        let (_pool, service) = setup_test_service().await;

        let standalone = service.create(CreateProductInput::new("Single")).await.unwrap();

        let no_parent = service
            .create(CreateProductInput::default().with_structure(ProductStructure::Child))
            .await;
        assert!(matches!(no_parent, Err(ProductServiceError::ValidationError(_))));

        let missing_parent = service.create(CreateProductInput::child_of(404)).await;
        assert!(matches!(missing_parent, Err(ProductServiceError::ValidationError(_))));

        let wrong_parent = service.create(CreateProductInput::child_of(standalone.id)).await;
        assert!(matches!(wrong_parent, Err(ProductServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_child_takes_parent_title() {
        let (_pool, service) = setup_test_service().await;

        let parent = service
            .create(CreateProductInput::new("T-Shirt").with_structure(ProductStructure::Parent))
            .await
            .unwrap();
        let child = service.create(CreateProductInput::child_of(parent.id)).await.unwrap();

        assert!(child.title.is_none());
        assert_eq!(child.slug, "t-shirt");

        let detail = service.get_detail(child.id).await.unwrap().unwrap();
        assert_eq!(detail.display_title.as_deref(), Some("T-Shirt"));

        let parent_detail = service.get_detail(parent.id).await.unwrap().unwrap();
        assert_eq!(parent_detail.children, vec![child.id]);
    }

    #[tokio::test]
    async fn test_child_cannot_have_categories() {
        let (pool, service) = setup_test_service().await;
        let category = create_category(&pool, "Clothing", None).await;

        let parent = service
            .create(CreateProductInput::new("Shirt").with_structure(ProductStructure::Parent))
            .await
            .unwrap();
        let result = service
            .create(CreateProductInput::child_of(parent.id).with_categories(vec![category.id]))
            .await;
        assert!(matches!(result, Err(ProductServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let (_pool, service) = setup_test_service().await;
        let result = service
            .create(CreateProductInput::new("Lamp").with_categories(vec![77]))
            .await;
        assert!(matches!(result, Err(ProductServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_list_filters_by_structure() {
        let (_pool, service) = setup_test_service().await;

        service.create(CreateProductInput::new("One")).await.unwrap();
        let parent = service
            .create(CreateProductInput::new("Two").with_structure(ProductStructure::Parent))
            .await
            .unwrap();
        service.create(CreateProductInput::child_of(parent.id)).await.unwrap();

        let params = ListParams::default();
        assert_eq!(service.list(None, &params).await.unwrap().total, 3);

        let parents = service.list(Some("parent"), &params).await.unwrap();
        assert_eq!(parents.total, 1);
        assert_eq!(parents.items[0].id, parent.id);

        let standalone = service.list(Some("standalone"), &params).await.unwrap();
        assert_eq!(standalone.items.len(), 1);

        let unknown = service.list(Some("bundle"), &params).await.unwrap();
        assert!(unknown.items.is_empty());
        assert_eq!(unknown.total, 0);
    }

    #[tokio::test]
    async fn test_detail_includes_categories_and_images() {
        let (pool, service) = setup_test_service().await;

        let books = create_category(&pool, "Books", None).await;
        let fiction = create_category(&pool, "Fiction", Some(books.id)).await;

        let product = service
            .create(CreateProductInput::new("Dune").with_categories(vec![fiction.id]))
            .await
            .unwrap();

        let image_repo = SqlxImageRepository::new(pool.clone());
        let now = Utc::now();
        image_repo
            .create(&ProductImage {
                id: 0,
                product_id: product.id,
                original: "images/dune.jpg".to_string(),
                caption: String::new(),
                display_order: 0,
                date_created: now,
            })
            .await
            .unwrap();

        let detail = service.get_detail(product.id).await.unwrap().unwrap();
        assert_eq!(detail.categories.len(), 1);
        assert_eq!(detail.categories[0].breadcrumbs, "Books > Fiction");
        assert_eq!(detail.images.len(), 1);
        assert!(detail.children.is_empty());

        assert!(service.get_detail(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_fields_and_categories() {
        let (pool, service) = setup_test_service().await;
        let category = create_category(&pool, "Kitchen", None).await;

        let product = service.create(CreateProductInput::new("Pan")).await.unwrap();
        let updated = service
            .update(
                product.id,
                UpdateProductInput::new()
                    .with_title("Frying Pan")
                    .with_categories(vec![category.id]),
            )
            .await
            .unwrap();
        assert_eq!(updated.title.as_deref(), Some("Frying Pan"));
        // Slug is stable unless set explicitly
        assert_eq!(updated.slug, "pan");

        let detail = service.get_detail(product.id).await.unwrap().unwrap();
        assert_eq!(detail.categories[0].category.id, category.id);
    }

    #[tokio::test]
    async fn test_parent_with_children_keeps_structure() {
        let (_pool, service) = setup_test_service().await;

        let parent = service
            .create(CreateProductInput::new("Shoe").with_structure(ProductStructure::Parent))
            .await
            .unwrap();
        service.create(CreateProductInput::child_of(parent.id)).await.unwrap();

        let result = service
            .update(
                parent.id,
                UpdateProductInput::new().with_structure(ProductStructure::Standalone),
            )
            .await;
        assert!(matches!(result, Err(ProductServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_stocked_product_cannot_become_parent() {
        let (pool, service) = setup_test_service().await;

        let product = service.create(CreateProductInput::new("Hat")).await.unwrap();
        let now = Utc::now();
        SqlxStockRecordRepository::new(pool.clone())
            .create(&StockRecord {
                id: 0,
                product_id: product.id,
                partner: "acme".to_string(),
                partner_sku: "HAT-1".to_string(),
                price_currency: "GBP".to_string(),
                price: None,
                num_in_stock: None,
                num_allocated: None,
                low_stock_threshold: None,
                date_created: now,
                date_updated: now,
            })
            .await
            .unwrap();

        let result = service
            .update(
                product.id,
                UpdateProductInput::new().with_structure(ProductStructure::Parent),
            )
            .await;
        assert!(matches!(result, Err(ProductServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let (_pool, service) = setup_test_service().await;

        assert!(matches!(
            service.update(5, UpdateProductInput::new()).await,
            Err(ProductServiceError::NotFound(_))
        ));
        assert!(matches!(service.delete(5).await, Err(ProductServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_children() {
        let (_pool, service) = setup_test_service().await;

        let parent = service
            .create(CreateProductInput::new("Sock").with_structure(ProductStructure::Parent))
            .await
            .unwrap();
        let child = service.create(CreateProductInput::child_of(parent.id)).await.unwrap();

        service.delete(parent.id).await.unwrap();
        assert!(service.get_by_id(parent.id).await.unwrap().is_none());
        assert!(service.get_by_id(child.id).await.unwrap().is_none());
    }
}
