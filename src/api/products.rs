//! Product API endpoints
//!
//! - GET/POST /api/v1/products
//! - GET/PUT/PATCH/DELETE /api/v1/products/{id}
//! - GET /api/v1/products/{id}/price
//! - GET /api/v1/products/{id}/availability
//! - GET /api/v1/products/{id}/stockrecords[/{stockrecord_id}]

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::common::ProductListQuery;
use crate::api::middleware::{ApiError, ApiJson, ApiPath, ApiQuery, AppState, CustomerContext};
use crate::api::responses::{
    PaginatedResponse, ProductLinkResponse, ProductResponse, StockRecordResponse,
};
use crate::models::{CreateProductInput, UpdateProductInput};
use crate::pricing::{Availability, Price};

/// Build the products router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product)
                .put(update_product)
                .patch(update_product)
                .delete(delete_product),
        )
        .route("/{id}/price", get(get_product_price))
        .route("/{id}/availability", get(get_product_availability))
        .route("/{id}/stockrecords", get(list_product_stockrecords))
        .route("/{id}/stockrecords/{stockrecord_id}", get(get_product_stockrecord))
}

/// GET /api/v1/products
async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductListQuery>,
) -> Result<Json<PaginatedResponse<ProductLinkResponse>>, ApiError> {
    let result = state
        .product_service
        .list(query.structure.as_deref(), &query.params())
        .await?;

    Ok(Json(PaginatedResponse::from_paged(result)))
}

/// POST /api/v1/products
async fn create_product(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateProductInput>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state.product_service.create(input).await?;
    let detail = state
        .product_service
        .get_detail(product.id)
        .await?
        .ok_or_else(|| ApiError::internal_error("Created product vanished"))?;

    Ok((StatusCode::CREATED, Json(detail.into())))
}

/// GET /api/v1/products/{id}
async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ProductResponse>, ApiError> {
    let detail = state
        .product_service
        .get_detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Product with ID {} not found", id)))?;

    Ok(Json(detail.into()))
}

/// PUT/PATCH /api/v1/products/{id}
///
/// Both methods apply a partial update.
async fn update_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateProductInput>,
) -> Result<Json<ProductResponse>, ApiError> {
    state.product_service.update(id, input).await?;
    let detail = state
        .product_service
        .get_detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Product with ID {} not found", id)))?;

    Ok(Json(detail.into()))
}

/// DELETE /api/v1/products/{id}
async fn delete_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.product_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/products/{id}/price
async fn get_product_price(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    CustomerContext(ctx): CustomerContext,
) -> Result<Json<Price>, ApiError> {
    let info = state.pricing_service.fetch(id, &ctx).await?;
    Ok(Json(info.price))
}

/// GET /api/v1/products/{id}/availability
async fn get_product_availability(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    CustomerContext(ctx): CustomerContext,
) -> Result<Json<Availability>, ApiError> {
    let info = state.pricing_service.fetch(id, &ctx).await?;
    Ok(Json(info.availability))
}

/// GET /api/v1/products/{id}/stockrecords
async fn list_product_stockrecords(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<StockRecordResponse>>, ApiError> {
    let records = state.stock_record_service.list_for_product(id).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/products/{id}/stockrecords/{stockrecord_id}
async fn get_product_stockrecord(
    State(state): State<AppState>,
    ApiPath((product_id, id)): ApiPath<(i64, i64)>,
) -> Result<Json<StockRecordResponse>, ApiError> {
    let record = state
        .stock_record_service
        .get_for_product(product_id, id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "Stock record with ID {} not found for product {}",
                id, product_id
            ))
        })?;

    Ok(Json(record.into()))
}
