//! Attribute service
//!
//! Attributes describe typed product properties (`weight`, `isbn`, ...).
//! Values are checked against the attribute's type before they are stored,
//! and a product holds at most one value per attribute.

use crate::db::is_unique_violation;
use crate::db::repositories::{AttributeRepository, AttributeValueRepository, ProductRepository};
use crate::models::{
    is_valid_attribute_code, CreateAttributeInput, CreateAttributeValueInput, ProductAttribute,
    ProductAttributeValue, UpdateAttributeInput, UpdateAttributeValueInput,
};
use anyhow::Context;
use std::sync::Arc;

/// Error types for attribute and attribute value operations
#[derive(Debug, thiserror::Error)]
pub enum AttributeServiceError {
    /// Attribute or value not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Another attribute already uses this code
    #[error("Attribute code already exists: {0}")]
    DuplicateCode(String),

    /// The product already has a value for this attribute
    #[error("Product {product_id} already has a value for attribute {attribute_id}")]
    DuplicateValue { product_id: i64, attribute_id: i64 },

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Service for attribute definitions
pub struct AttributeService {
    repo: Arc<dyn AttributeRepository>,
    value_repo: Arc<dyn AttributeValueRepository>,
}

impl AttributeService {
    pub fn new(repo: Arc<dyn AttributeRepository>, value_repo: Arc<dyn AttributeValueRepository>) -> Self {
        Self { repo, value_repo }
    }

    /// Create an attribute
    ///
    /// # Errors
    /// - `ValidationError` for an empty name or a code that is not an identifier
    /// - `DuplicateCode` if the code is taken
    pub async fn create(&self, input: CreateAttributeInput) -> Result<ProductAttribute, AttributeServiceError> {
        let name = validate_name(&input.name)?;
        let code = validate_code(&input.code)?;

        if self.repo.get_by_code(&code).await.context("Failed to check code uniqueness")?.is_some() {
            return Err(AttributeServiceError::DuplicateCode(code));
        }

        let attribute = ProductAttribute {
            id: 0,
            name,
            code,
            attr_type: input.attr_type,
            required: input.required,
        };
        let created = self
            .repo
            .create(&attribute)
            .await
            .map_err(|e| code_conflict(e, &attribute, "Failed to create attribute"))?;
        tracing::info!(id = created.id, code = %created.code, "Created attribute");

        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ProductAttribute>, AttributeServiceError> {
        self.repo.get_by_id(id).await.context("Failed to get attribute").map_err(Into::into)
    }

    pub async fn list(&self) -> Result<Vec<ProductAttribute>, AttributeServiceError> {
        self.repo.list().await.context("Failed to list attributes").map_err(Into::into)
    }

    /// Update an attribute.
    ///
    /// The type can only change while no value is recorded for the attribute.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateAttributeInput,
    ) -> Result<ProductAttribute, AttributeServiceError> {
        let mut attribute = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get attribute")?
            .ok_or_else(|| AttributeServiceError::NotFound(format!("Attribute with ID {} not found", id)))?;

        if let Some(name) = input.name {
            attribute.name = validate_name(&name)?;
        }

        if let Some(code) = input.code {
            let code = validate_code(&code)?;
            if code != attribute.code {
                if self.repo.get_by_code(&code).await.context("Failed to check code uniqueness")?.is_some() {
                    return Err(AttributeServiceError::DuplicateCode(code));
                }
                attribute.code = code;
            }
        }

        if let Some(attr_type) = input.attr_type {
            if attr_type != attribute.attr_type {
                if self
                    .value_repo
                    .exists_for_attribute(id)
                    .await
                    .context("Failed to check attribute values")?
                {
                    return Err(AttributeServiceError::ValidationError(format!(
                        "Attribute '{}' has values; its type can't change",
                        attribute.code
                    )));
                }
                attribute.attr_type = attr_type;
            }
        }

        if let Some(required) = input.required {
            attribute.required = required;
        }

        let updated = self
            .repo
            .update(&attribute)
            .await
            .map_err(|e| code_conflict(e, &attribute, "Failed to update attribute"))?;
        tracing::info!(id, "Updated attribute");
        Ok(updated)
    }

    /// Delete an attribute and every value recorded for it
    pub async fn delete(&self, id: i64) -> Result<(), AttributeServiceError> {
        if self.repo.get_by_id(id).await.context("Failed to get attribute")?.is_none() {
            return Err(AttributeServiceError::NotFound(format!("Attribute with ID {} not found", id)));
        }
        self.repo.delete(id).await.context("Failed to delete attribute")?;
        tracing::info!(id, "Deleted attribute");
        Ok(())
    }
}

/// Service for product attribute values
pub struct AttributeValueService {
    repo: Arc<dyn AttributeValueRepository>,
    attribute_repo: Arc<dyn AttributeRepository>,
    product_repo: Arc<dyn ProductRepository>,
}

impl AttributeValueService {
    pub fn new(
        repo: Arc<dyn AttributeValueRepository>,
        attribute_repo: Arc<dyn AttributeRepository>,
        product_repo: Arc<dyn ProductRepository>,
    ) -> Self {
        Self {
            repo,
            attribute_repo,
            product_repo,
        }
    }

    /// Record a product's value for an attribute
    ///
    /// # Errors
    /// - `ValidationError` if the product or attribute is unknown, or the value
    ///   doesn't match the attribute type
    /// - `DuplicateValue` if the product already has a value for the attribute
    pub async fn create(
        &self,
        input: CreateAttributeValueInput,
    ) -> Result<ProductAttributeValue, AttributeServiceError> {
        self.check_product(input.product_id).await?;
        let attribute = self.load_attribute(input.attribute_id).await?;
        let value = validate_value(&attribute, &input.value)?;

        if self
            .repo
            .get_for(input.product_id, input.attribute_id)
            .await
            .context("Failed to check existing value")?
            .is_some()
        {
            return Err(AttributeServiceError::DuplicateValue {
                product_id: input.product_id,
                attribute_id: input.attribute_id,
            });
        }

        let record = ProductAttributeValue {
            id: 0,
            product_id: input.product_id,
            attribute_id: input.attribute_id,
            value,
        };
        let created = self
            .repo
            .create(&record)
            .await
            .map_err(|e| value_conflict(e, &record, "Failed to create attribute value"))?;
        tracing::info!(
            id = created.id,
            product_id = created.product_id,
            attribute = %attribute.code,
            "Created attribute value"
        );

        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ProductAttributeValue>, AttributeServiceError> {
        self.repo.get_by_id(id).await.context("Failed to get attribute value").map_err(Into::into)
    }

    /// List values, optionally only those of one product
    pub async fn list(&self, product_id: Option<i64>) -> Result<Vec<ProductAttributeValue>, AttributeServiceError> {
        self.repo.list(product_id).await.context("Failed to list attribute values").map_err(Into::into)
    }

    /// Update a value; the (possibly new) value is checked against the
    /// (possibly new) attribute
    pub async fn update(
        &self,
        id: i64,
        input: UpdateAttributeValueInput,
    ) -> Result<ProductAttributeValue, AttributeServiceError> {
        let mut record = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get attribute value")?
            .ok_or_else(|| {
                AttributeServiceError::NotFound(format!("Attribute value with ID {} not found", id))
            })?;

        if let Some(product_id) = input.product_id {
            if product_id != record.product_id {
                self.check_product(product_id).await?;
                record.product_id = product_id;
            }
        }
        if let Some(attribute_id) = input.attribute_id {
            record.attribute_id = attribute_id;
        }
        if let Some(value) = input.value {
            record.value = value;
        }

        let attribute = self.load_attribute(record.attribute_id).await?;
        record.value = validate_value(&attribute, &record.value)?;

        if let Some(existing) = self
            .repo
            .get_for(record.product_id, record.attribute_id)
            .await
            .context("Failed to check existing value")?
        {
            if existing.id != id {
                return Err(AttributeServiceError::DuplicateValue {
                    product_id: record.product_id,
                    attribute_id: record.attribute_id,
                });
            }
        }

        let updated = self
            .repo
            .update(&record)
            .await
            .map_err(|e| value_conflict(e, &record, "Failed to update attribute value"))?;
        tracing::info!(id, "Updated attribute value");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AttributeServiceError> {
        if self.repo.get_by_id(id).await.context("Failed to get attribute value")?.is_none() {
            return Err(AttributeServiceError::NotFound(format!(
                "Attribute value with ID {} not found",
                id
            )));
        }
        self.repo.delete(id).await.context("Failed to delete attribute value")?;
        tracing::info!(id, "Deleted attribute value");
        Ok(())
    }

    async fn check_product(&self, product_id: i64) -> Result<(), AttributeServiceError> {
        if self.product_repo.get_by_id(product_id).await.context("Failed to get product")?.is_none() {
            return Err(AttributeServiceError::ValidationError(format!(
                "Product {} does not exist",
                product_id
            )));
        }
        Ok(())
    }

    async fn load_attribute(&self, attribute_id: i64) -> Result<ProductAttribute, AttributeServiceError> {
        self.attribute_repo
            .get_by_id(attribute_id)
            .await
            .context("Failed to get attribute")?
            .ok_or_else(|| {
                AttributeServiceError::ValidationError(format!("Attribute {} does not exist", attribute_id))
            })
    }
}

/// The code's UNIQUE constraint caught a concurrent writer
fn code_conflict(
    err: anyhow::Error,
    attribute: &ProductAttribute,
    context: &'static str,
) -> AttributeServiceError {
    if is_unique_violation(&err) {
        AttributeServiceError::DuplicateCode(attribute.code.clone())
    } else {
        AttributeServiceError::InternalError(err.context(context))
    }
}

/// The (product, attribute) UNIQUE constraint caught a concurrent writer
fn value_conflict(
    err: anyhow::Error,
    record: &ProductAttributeValue,
    context: &'static str,
) -> AttributeServiceError {
    if is_unique_violation(&err) {
        AttributeServiceError::DuplicateValue {
            product_id: record.product_id,
            attribute_id: record.attribute_id,
        }
    } else {
        AttributeServiceError::InternalError(err.context(context))
    }
}

fn validate_name(name: &str) -> Result<String, AttributeServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AttributeServiceError::ValidationError(
            "Attribute name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn validate_code(code: &str) -> Result<String, AttributeServiceError> {
    let code = code.trim();
    if !is_valid_attribute_code(code) {
        return Err(AttributeServiceError::ValidationError(format!(
            "'{}' is not a valid attribute code",
            code
        )));
    }
    Ok(code.to_string())
}

fn validate_value(
    attribute: &ProductAttribute,
    value: &serde_json::Value,
) -> Result<serde_json::Value, AttributeServiceError> {
    attribute
        .attr_type
        .validate_value(value)
        .map_err(|message| AttributeServiceError::ValidationError(format!("{}: {}", attribute.code, message)))
}
