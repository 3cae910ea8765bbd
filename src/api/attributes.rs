//! Product attribute API endpoints
//!
//! - GET/POST /api/v1/attributes
//! - GET/PUT/PATCH/DELETE /api/v1/attributes/{id}

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, ApiJson, ApiPath, AppState};
use crate::api::responses::AttributeResponse;
use crate::models::{CreateAttributeInput, UpdateAttributeInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_attributes).post(create_attribute))
        .route(
            "/{id}",
            get(get_attribute)
                .put(update_attribute)
                .patch(update_attribute)
                .delete(delete_attribute),
        )
}

async fn list_attributes(
    State(state): State<AppState>,
) -> Result<Json<Vec<AttributeResponse>>, ApiError> {
    let attributes = state.attribute_service.list().await?;
    Ok(Json(attributes.into_iter().map(Into::into).collect()))
}

async fn create_attribute(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateAttributeInput>,
) -> Result<(StatusCode, Json<AttributeResponse>), ApiError> {
    let attribute = state.attribute_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(attribute.into())))
}

async fn get_attribute(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<AttributeResponse>, ApiError> {
    let attribute = state
        .attribute_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Attribute with ID {} not found", id)))?;

    Ok(Json(attribute.into()))
}

async fn update_attribute(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateAttributeInput>,
) -> Result<Json<AttributeResponse>, ApiError> {
    let attribute = state.attribute_service.update(id, input).await?;
    Ok(Json(attribute.into()))
}

/// Deleting an attribute also deletes its values
async fn delete_attribute(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.attribute_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
