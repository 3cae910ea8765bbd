//! Category API endpoints
//!
//! Handles HTTP requests for the category tree:
//! - GET/POST /api/v1/categories - Root categories / create
//! - GET /api/v1/categories/browse/{*breadcrumbs} - Children of a slug path
//! - GET/PUT/PATCH/DELETE /api/v1/categories/{id}

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, ApiJson, ApiPath, AppState};
use crate::api::responses::CategoryResponse;
use crate::models::{CreateCategoryInput, UpdateCategoryInput};

/// Build the categories router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/browse/{*breadcrumbs}", get(list_categories_by_path))
        .route(
            "/{id}",
            get(get_category)
                .put(update_category)
                .patch(update_category)
                .delete(delete_category),
        )
}

/// GET /api/v1/categories - Root categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let roots = state.category_service.list_roots().await?;
    Ok(Json(roots.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/categories/browse/{*breadcrumbs}
///
/// `books/fiction` lists the children of `fiction` under `books`.
async fn list_categories_by_path(
    State(state): State<AppState>,
    ApiPath(breadcrumbs): ApiPath<String>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let children = state.category_service.list_by_path(&breadcrumbs).await?;
    Ok(Json(children.into_iter().map(Into::into).collect()))
}

/// POST /api/v1/categories
async fn create_category(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateCategoryInput>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let category = state.category_service.create(input).await?;
    let breadcrumbs = state.category_service.breadcrumbs(category.id).await?;

    let mut response = CategoryResponse::from(category);
    response.breadcrumbs = Some(breadcrumbs);
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state
        .category_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Category with ID {} not found", id)))?;
    let breadcrumbs = state.category_service.breadcrumbs(id).await?;

    let mut response = CategoryResponse::from(category);
    response.breadcrumbs = Some(breadcrumbs);
    Ok(Json(response))
}

/// PUT/PATCH /api/v1/categories/{id}
async fn update_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateCategoryInput>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state.category_service.update(id, input).await?;
    let breadcrumbs = state.category_service.breadcrumbs(id).await?;

    let mut response = CategoryResponse::from(category);
    response.breadcrumbs = Some(breadcrumbs);
    Ok(Json(response))
}

/// DELETE /api/v1/categories/{id} - Removes the whole subtree
async fn delete_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
