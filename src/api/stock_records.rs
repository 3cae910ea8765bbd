//! Stock record API endpoints
//!
//! - GET/POST /api/v1/stockrecords
//! - GET/PUT/PATCH/DELETE /api/v1/stockrecords/{id}

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, ApiJson, ApiPath, AppState};
use crate::api::responses::StockRecordResponse;
use crate::models::{CreateStockRecordInput, UpdateStockRecordInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stockrecords).post(create_stockrecord))
        .route(
            "/{id}",
            get(get_stockrecord)
                .put(update_stockrecord)
                .patch(update_stockrecord)
                .delete(delete_stockrecord),
        )
}

async fn list_stockrecords(
    State(state): State<AppState>,
) -> Result<Json<Vec<StockRecordResponse>>, ApiError> {
    let records = state.stock_record_service.list().await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

async fn create_stockrecord(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateStockRecordInput>,
) -> Result<(StatusCode, Json<StockRecordResponse>), ApiError> {
    let record = state.stock_record_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

async fn get_stockrecord(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<StockRecordResponse>, ApiError> {
    let record = state
        .stock_record_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Stock record with ID {} not found", id)))?;

    Ok(Json(record.into()))
}

async fn update_stockrecord(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateStockRecordInput>,
) -> Result<Json<StockRecordResponse>, ApiError> {
    let record = state.stock_record_service.update(id, input).await?;
    Ok(Json(record.into()))
}

async fn delete_stockrecord(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.stock_record_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
