//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints of the catalogue.
//! It includes:
//! - Product endpoints, with price, availability and stock record sub-resources
//! - Stock record endpoints
//! - Category endpoints, including slug-path browsing
//! - Attribute and attribute value endpoints
//! - Image endpoints
//! - Health check

pub mod attribute_values;
pub mod attributes;
pub mod categories;
pub mod common;
pub mod health;
pub mod images;
pub mod middleware;
pub mod products;
pub mod responses;
pub mod stock_records;

#[cfg(test)]
mod tests;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub use common::API_PREFIX;
pub use middleware::{ApiError, AppState};

/// Build the API router (everything below `/api/v1`)
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/stockrecords", stock_records::router())
        .nest("/categories", categories::router())
        .nest("/attributes", attributes::router())
        .nest("/attribute-values", attribute_values::router())
        .nest("/images", images::router())
        .nest("/health", health::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    Router::new()
        .nest(API_PREFIX, build_api_router())
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors_layer(cors_origin)),
        )
        .with_state(state)
}

/// CORS for the configured origin; `*` or an unparsable origin allows any
fn cors_layer(cors_origin: &str) -> CorsLayer {
    let origin = match cors_origin.trim() {
        "*" => AllowOrigin::from(Any),
        value => match value.parse::<HeaderValue>() {
            Ok(origin) => AllowOrigin::exact(origin),
            Err(_) => {
                tracing::warn!("Invalid CORS origin {:?}, allowing any origin", value);
                AllowOrigin::from(Any)
            }
        },
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(middleware::CUSTOMER_ID_HEADER),
        ])
}

async fn not_found() -> ApiError {
    ApiError::not_found("Resource not found")
}
