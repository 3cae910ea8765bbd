//! API middleware and shared request plumbing
//!
//! Contains:
//! - `AppState`, the services shared by every handler
//! - `ApiError`, the JSON error body and its status mapping
//! - Extractors that turn malformed JSON or path segments into `ApiError`
//! - The customer context extractor handed to the pricing selector

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxAttributeRepository, SqlxAttributeValueRepository, SqlxCategoryRepository,
    SqlxImageRepository, SqlxProductRepository, SqlxStockRecordRepository,
};
use crate::db::DynDatabasePool;
use crate::pricing::{DefaultSelector, RequestContext};
use crate::services::{
    normalize_currency, AttributeService, AttributeServiceError, AttributeValueService, CategoryService,
    CategoryServiceError, ImageService, ImageServiceError, PricingService, PricingServiceError,
    ProductService, ProductServiceError, StockRecordService, StockRecordServiceError,
};

/// Header carrying the customer identity used to pick a pricing strategy
pub const CUSTOMER_ID_HEADER: &str = "x-customer-id";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub product_service: Arc<ProductService>,
    pub category_service: Arc<CategoryService>,
    pub attribute_service: Arc<AttributeService>,
    pub attribute_value_service: Arc<AttributeValueService>,
    pub image_service: Arc<ImageService>,
    pub stock_record_service: Arc<StockRecordService>,
    pub pricing_service: Arc<PricingService>,
}

impl AppState {
    /// Wire repositories and services over one pool.
    ///
    /// Fails when the configured tax rate cannot be parsed or the default
    /// currency is not a three-letter code.
    pub fn new(pool: DynDatabasePool, cache: Arc<Cache>, config: &Config) -> anyhow::Result<Self> {
        let product_repo = SqlxProductRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let attribute_repo = SqlxAttributeRepository::boxed(pool.clone());
        let value_repo = SqlxAttributeValueRepository::boxed(pool.clone());
        let image_repo = SqlxImageRepository::boxed(pool.clone());
        let stock_repo = SqlxStockRecordRepository::boxed(pool.clone());

        let selector = DefaultSelector::from_config(&config.pricing)
            .with_context(|| format!("Invalid pricing.tax_rate '{}'", config.pricing.tax_rate))?
            .boxed();
        let default_currency = normalize_currency(&config.pricing.default_currency).with_context(|| {
            format!("Invalid pricing.default_currency '{}'", config.pricing.default_currency)
        })?;

        Ok(Self {
            product_service: Arc::new(ProductService::new(
                product_repo.clone(),
                category_repo.clone(),
                value_repo.clone(),
                image_repo.clone(),
                stock_repo.clone(),
            )),
            category_service: Arc::new(CategoryService::with_cache_ttl(
                category_repo,
                cache,
                Duration::from_secs(config.cache.ttl_seconds),
            )),
            attribute_service: Arc::new(AttributeService::new(attribute_repo.clone(), value_repo.clone())),
            attribute_value_service: Arc::new(AttributeValueService::new(
                value_repo,
                attribute_repo,
                product_repo.clone(),
            )),
            image_service: Arc::new(ImageService::new(image_repo, product_repo.clone())),
            stock_record_service: Arc::new(StockRecordService::new(
                stock_repo.clone(),
                product_repo.clone(),
                default_currency,
            )),
            pricing_service: Arc::new(PricingService::new(product_repo, stock_repo, selector)),
            pool,
        })
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    /// Log the cause and return a generic 500
    pub fn internal_error(err: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", err);
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

// ============================================================================
// Extractor rejections
// ============================================================================

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

/// `Json` whose rejection is an `ApiError`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path` whose rejection is an `ApiError`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `Query` whose rejection is an `ApiError`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Pricing context read from the request headers
#[derive(Debug, Clone, Default)]
pub struct CustomerContext(pub RequestContext);

impl<S> FromRequestParts<S> for CustomerContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer_id = parts
            .headers
            .get(CUSTOMER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(CustomerContext(RequestContext { customer_id }))
    }
}

// ============================================================================
// Service error mapping
// ============================================================================

impl From<ProductServiceError> for ApiError {
    fn from(err: ProductServiceError) -> Self {
        match err {
            ProductServiceError::NotFound(msg) => ApiError::not_found(msg),
            ProductServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ProductServiceError::DuplicateUpc(_) => ApiError::conflict(err.to_string()),
            ProductServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(err: CategoryServiceError) -> Self {
        match err {
            CategoryServiceError::NotFound(msg) => ApiError::not_found(msg),
            CategoryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CategoryServiceError::ParentNotFound(_) | CategoryServiceError::CircularReference => {
                ApiError::validation_error(err.to_string())
            }
            CategoryServiceError::DuplicateSlug(_) => ApiError::conflict(err.to_string()),
            CategoryServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<AttributeServiceError> for ApiError {
    fn from(err: AttributeServiceError) -> Self {
        match err {
            AttributeServiceError::NotFound(msg) => ApiError::not_found(msg),
            AttributeServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            AttributeServiceError::DuplicateCode(_) | AttributeServiceError::DuplicateValue { .. } => {
                ApiError::conflict(err.to_string())
            }
            AttributeServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<ImageServiceError> for ApiError {
    fn from(err: ImageServiceError) -> Self {
        match err {
            ImageServiceError::NotFound(msg) => ApiError::not_found(msg),
            ImageServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ImageServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<StockRecordServiceError> for ApiError {
    fn from(err: StockRecordServiceError) -> Self {
        match err {
            StockRecordServiceError::NotFound(msg) => ApiError::not_found(msg),
            StockRecordServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            StockRecordServiceError::DuplicateSku { .. } => ApiError::conflict(err.to_string()),
            StockRecordServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<PricingServiceError> for ApiError {
    fn from(err: PricingServiceError) -> Self {
        match err {
            PricingServiceError::NotFound(msg) => ApiError::not_found(msg),
            PricingServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::new("SOMETHING", "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_shape() {
        let json = serde_json::to_value(ApiError::not_found("Product with ID 3 not found")).unwrap();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "Product with ID 3 not found");
        assert!(json["error"].get("details").is_none());

        let json = serde_json::to_value(ApiError::with_details(
            "VALIDATION_ERROR",
            "bad",
            serde_json::json!({"field": "title"}),
        ))
        .unwrap();
        assert_eq!(json["error"]["details"]["field"], "title");
    }

    #[test]
    fn test_internal_error_hides_cause() {
        let err = ApiError::from(ProductServiceError::InternalError(anyhow::anyhow!("db down")));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.error.message.contains("db down"));
    }

    #[test]
    fn test_service_error_mapping() {
        assert_eq!(
            ApiError::from(ProductServiceError::DuplicateUpc("1".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(CategoryServiceError::CircularReference).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AttributeServiceError::DuplicateValue {
                product_id: 1,
                attribute_id: 2
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(StockRecordServiceError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_customer_context_from_header() {
        let request = Request::builder()
            .header(CUSTOMER_ID_HEADER, " 42 ")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let CustomerContext(ctx) = CustomerContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(ctx.customer_id.as_deref(), Some("42"));

        let request = Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        let CustomerContext(ctx) = CustomerContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(ctx.customer_id.is_none());
    }
}
