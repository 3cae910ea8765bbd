//! Product image API endpoints
//!
//! Images are stored by reference; `original` is a path or URL.

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::common::ProductFilterQuery;
use crate::api::middleware::{ApiError, ApiJson, ApiPath, ApiQuery, AppState};
use crate::api::responses::ImageResponse;
use crate::models::{CreateImageInput, UpdateImageInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_images).post(create_image))
        .route(
            "/{id}",
            get(get_image)
                .put(update_image)
                .patch(update_image)
                .delete(delete_image),
        )
}

/// GET /api/v1/images?product=ID
async fn list_images(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilterQuery>,
) -> Result<Json<Vec<ImageResponse>>, ApiError> {
    let images = state.image_service.list(filter.product).await?;
    Ok(Json(images.into_iter().map(Into::into).collect()))
}

async fn create_image(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateImageInput>,
) -> Result<(StatusCode, Json<ImageResponse>), ApiError> {
    let image = state.image_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(image.into())))
}

async fn get_image(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ImageResponse>, ApiError> {
    let image = state
        .image_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Image with ID {} not found", id)))?;

    Ok(Json(image.into()))
}

async fn update_image(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateImageInput>,
) -> Result<Json<ImageResponse>, ApiError> {
    let image = state.image_service.update(id, input).await?;
    Ok(Json(image.into()))
}

async fn delete_image(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.image_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
