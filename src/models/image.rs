//! Product image model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An image attached to a product. The lowest `display_order` is the primary
/// image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    /// Image location (URL or storage path)
    pub original: String,
    pub caption: String,
    pub display_order: i32,
    pub date_created: DateTime<Utc>,
}

/// Input for attaching an image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateImageInput {
    pub product_id: i64,
    pub original: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub display_order: i32,
}

impl CreateImageInput {
    pub fn new(product_id: i64, original: impl Into<String>) -> Self {
        Self {
            product_id,
            original: original.into(),
            caption: String::new(),
            display_order: 0,
        }
    }

    pub fn with_display_order(mut self, display_order: i32) -> Self {
        self.display_order = display_order;
        self
    }
}

/// Input for updating an image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateImageInput {
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub display_order: Option<i32>,
}
