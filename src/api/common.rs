//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints.

use serde::Deserialize;

use crate::models::ListParams;

// ============================================================================
// Pagination
// ============================================================================

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size
pub fn default_page_size() -> u32 {
    20
}

// ============================================================================
// Filters
// ============================================================================

/// `?structure=` filter for product listings, plus pagination
#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub structure: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl ProductListQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.page_size)
    }
}

/// `?product=` filter for resources owned by a product
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilterQuery {
    pub product: Option<i64>,
}

// ============================================================================
// URLs
// ============================================================================

/// Prefix of every API route
pub const API_PREFIX: &str = "/api/v1";

/// Relative URL of an API resource, e.g. `api_url(&["products", "3"])`
pub fn api_url(segments: &[&str]) -> String {
    let mut url = String::from(API_PREFIX);
    for segment in segments {
        url.push('/');
        url.push_str(segment);
    }
    url
}
