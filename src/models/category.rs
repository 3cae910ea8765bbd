//! Category model
//!
//! Categories form a tree. A category is addressed either by id or by its
//! slug path from the root (`clothing/shirts/formal`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator between slugs in a category path
pub const SLUG_PATH_SEPARATOR: char = '/';

/// Separator between names in a breadcrumb trail
pub const BREADCRUMB_SEPARATOR: &str = " > ";

/// Category entity representing a node in the catalogue tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Category name
    pub name: String,
    /// URL-friendly slug, unique among siblings
    pub slug: String,
    /// Category description
    pub description: Option<String>,
    /// Parent category ID (None for roots)
    pub parent_id: Option<i64>,
    /// Sort order within parent
    pub sort_order: i32,
    /// Whether the category is shown to customers
    pub is_public: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new public Category.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(name: impl Into<String>, slug: impl Into<String>, parent_id: Option<i64>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            slug: slug.into(),
            description: None,
            parent_id,
            sort_order: 0,
            is_public: true,
            created_at: Utc::now(),
        }
    }

    /// Check if this is a root category (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Join ancestor slugs (root first) into a full slug path.
pub fn full_slug(path: &[Category]) -> String {
    path.iter()
        .map(|c| c.slug.as_str())
        .collect::<Vec<_>>()
        .join(&SLUG_PATH_SEPARATOR.to_string())
}

/// Join ancestor names (root first) into a breadcrumb trail.
pub fn breadcrumbs(path: &[Category]) -> String {
    path.iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(BREADCRUMB_SEPARATOR)
}

/// Split a slug path into its segments, ignoring empty ones.
///
/// `"/clothing//shirts/"` yields `["clothing", "shirts"]`.
pub fn split_slug_path(path: &str) -> Vec<&str> {
    path.split(SLUG_PATH_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Input for creating a new category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryInput {
    /// Category name
    pub name: String,
    /// URL-friendly slug (generated from the name when omitted)
    #[serde(default)]
    pub slug: Option<String>,
    /// Category description
    #[serde(default)]
    pub description: Option<String>,
    /// Parent category ID
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Sort order within parent
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

impl CreateCategoryInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: None,
            description: None,
            parent_id: None,
            sort_order: None,
            is_public: None,
        }
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = Some(sort_order);
        self
    }
}

/// Input for updating a category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
    /// `Some(None)` moves the category to the root
    #[serde(default, deserialize_with = "super::double_option")]
    pub parent_id: Option<Option<i64>>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub is_public: Option<bool>,
}
