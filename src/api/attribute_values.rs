//! Product attribute value API endpoints
//!
//! - GET/POST /api/v1/attribute-values (`?product=ID` filter)
//! - GET/PUT/PATCH/DELETE /api/v1/attribute-values/{id}

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::common::ProductFilterQuery;
use crate::api::middleware::{ApiError, ApiJson, ApiPath, ApiQuery, AppState};
use crate::api::responses::AttributeValueResponse;
use crate::models::{CreateAttributeValueInput, UpdateAttributeValueInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_values).post(create_value))
        .route(
            "/{id}",
            get(get_value)
                .put(update_value)
                .patch(update_value)
                .delete(delete_value),
        )
}

async fn list_values(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilterQuery>,
) -> Result<Json<Vec<AttributeValueResponse>>, ApiError> {
    let values = state.attribute_value_service.list(filter.product).await?;
    Ok(Json(values.into_iter().map(Into::into).collect()))
}

async fn create_value(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateAttributeValueInput>,
) -> Result<(StatusCode, Json<AttributeValueResponse>), ApiError> {
    let value = state.attribute_value_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(value.into())))
}

async fn get_value(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<AttributeValueResponse>, ApiError> {
    let value = state
        .attribute_value_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Attribute value with ID {} not found", id)))?;

    Ok(Json(value.into()))
}

async fn update_value(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateAttributeValueInput>,
) -> Result<Json<AttributeValueResponse>, ApiError> {
    let value = state.attribute_value_service.update(id, input).await?;
    Ok(Json(value.into()))
}

async fn delete_value(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.attribute_value_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
