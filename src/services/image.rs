//! Image service

use crate::db::repositories::{ImageRepository, ProductRepository};
use crate::models::{CreateImageInput, ProductImage, UpdateImageInput};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Error types for image service operations
#[derive(Debug, thiserror::Error)]
pub enum ImageServiceError {
    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Product image service
pub struct ImageService {
    repo: Arc<dyn ImageRepository>,
    product_repo: Arc<dyn ProductRepository>,
}

impl ImageService {
    pub fn new(repo: Arc<dyn ImageRepository>, product_repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo, product_repo }
    }

    /// Attach an image to a product
    pub async fn create(&self, input: CreateImageInput) -> Result<ProductImage, ImageServiceError> {
        let original = validate_original(&input.original)?;
        self.check_product(input.product_id).await?;

        let image = ProductImage {
            id: 0,
            product_id: input.product_id,
            original,
            caption: input.caption.trim().to_string(),
            display_order: input.display_order,
            date_created: Utc::now(),
        };
        let created = self.repo.create(&image).await.context("Failed to create image")?;
        tracing::info!(id = created.id, product_id = created.product_id, "Created product image");

        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ProductImage>, ImageServiceError> {
        self.repo.get_by_id(id).await.context("Failed to get image").map_err(Into::into)
    }

    /// List images, optionally only those of one product
    pub async fn list(&self, product_id: Option<i64>) -> Result<Vec<ProductImage>, ImageServiceError> {
        self.repo.list(product_id).await.context("Failed to list images").map_err(Into::into)
    }

    pub async fn update(&self, id: i64, input: UpdateImageInput) -> Result<ProductImage, ImageServiceError> {
        let mut image = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get image")?
            .ok_or_else(|| ImageServiceError::NotFound(format!("Image with ID {} not found", id)))?;

        if let Some(product_id) = input.product_id {
            if product_id != image.product_id {
                self.check_product(product_id).await?;
                image.product_id = product_id;
            }
        }
        if let Some(original) = input.original {
            image.original = validate_original(&original)?;
        }
        if let Some(caption) = input.caption {
            image.caption = caption.trim().to_string();
        }
        if let Some(display_order) = input.display_order {
            image.display_order = display_order;
        }

        let updated = self.repo.update(&image).await.context("Failed to update image")?;
        tracing::info!(id, "Updated product image");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ImageServiceError> {
        if self.repo.get_by_id(id).await.context("Failed to get image")?.is_none() {
            return Err(ImageServiceError::NotFound(format!("Image with ID {} not found", id)));
        }
        self.repo.delete(id).await.context("Failed to delete image")?;
        tracing::info!(id, "Deleted product image");
        Ok(())
    }

    async fn check_product(&self, product_id: i64) -> Result<(), ImageServiceError> {
        if self.product_repo.get_by_id(product_id).await.context("Failed to get product")?.is_none() {
            return Err(ImageServiceError::ValidationError(format!(
                "Product {} does not exist",
                product_id
            )));
        }
        Ok(())
    }
}

fn validate_original(original: &str) -> Result<String, ImageServiceError> {
    let original = original.trim();
    if original.is_empty() {
        return Err(ImageServiceError::ValidationError(
            "Image location cannot be empty".to_string(),
        ));
    }
    Ok(original.to_string())
}
