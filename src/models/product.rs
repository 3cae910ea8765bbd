//! Product model
//!
//! Products come in three structures. Standalone products are sold as they
//! are. Parent products group variants and are never sold directly. Child
//! products are the variants; they inherit their title from the parent when
//! they have none of their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, ProductImage};

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique identifier
    pub id: i64,
    /// Standalone, parent or child
    pub structure: ProductStructure,
    /// Universal product code, unique when present
    pub upc: Option<String>,
    /// Parent product (children only)
    pub parent_id: Option<i64>,
    /// Product title; children may leave it empty
    pub title: Option<String>,
    /// URL-friendly slug
    pub slug: String,
    pub description: String,
    /// Whether the product is shown to customers
    pub is_public: bool,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl Product {
    pub fn is_standalone(&self) -> bool {
        self.structure == ProductStructure::Standalone
    }

    pub fn is_parent(&self) -> bool {
        self.structure == ProductStructure::Parent
    }

    pub fn is_child(&self) -> bool {
        self.structure == ProductStructure::Child
    }

    /// Parent products are never sold directly, so they hold no stock.
    pub fn can_have_stockrecords(&self) -> bool {
        !self.is_parent()
    }

    /// Title to show customers, falling back to the parent's title for
    /// children without one.
    pub fn display_title(&self, parent: Option<&Product>) -> Option<String> {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => Some(title.to_string()),
            _ if self.is_child() => parent.and_then(|p| p.title.clone()),
            _ => None,
        }
    }
}

/// Product structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStructure {
    #[default]
    Standalone,
    Parent,
    Child,
}

impl ProductStructure {
    /// Database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStructure::Standalone => "standalone",
            ProductStructure::Parent => "parent",
            ProductStructure::Child => "child",
        }
    }

    /// Parse from the database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standalone" => Some(ProductStructure::Standalone),
            "parent" => Some(ProductStructure::Parent),
            "child" => Some(ProductStructure::Child),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductStructure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProductInput {
    #[serde(default)]
    pub structure: ProductStructure,
    #[serde(default)]
    pub upc: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    /// Generated from the title when omitted
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_is_public")]
    pub is_public: bool,
    /// Categories to link the product to
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

fn default_is_public() -> bool {
    true
}

impl CreateProductInput {
    /// A public standalone product with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            is_public: true,
            ..Default::default()
        }
    }

    /// A child variant of `parent_id`
    pub fn child_of(parent_id: i64) -> Self {
        Self {
            structure: ProductStructure::Child,
            parent_id: Some(parent_id),
            is_public: true,
            ..Default::default()
        }
    }

    pub fn with_structure(mut self, structure: ProductStructure) -> Self {
        self.structure = structure;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_upc(mut self, upc: impl Into<String>) -> Self {
        self.upc = Some(upc.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_categories(mut self, category_ids: Vec<i64>) -> Self {
        self.category_ids = category_ids;
        self
    }
}

/// Input for updating a product. Absent fields are left unchanged.
///
/// Nullable columns use `Option<Option<_>>` so a client can clear them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProductInput {
    #[serde(default)]
    pub structure: Option<ProductStructure>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub upc: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub parent_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub title: Option<Option<String>>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub category_ids: Option<Vec<i64>>,
}

impl UpdateProductInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(Some(title.into()));
        self
    }

    pub fn with_structure(mut self, structure: ProductStructure) -> Self {
        self.structure = Some(structure);
        self
    }

    pub fn with_categories(mut self, category_ids: Vec<i64>) -> Self {
        self.category_ids = Some(category_ids);
        self
    }

    /// Check whether any field is set
    pub fn has_changes(&self) -> bool {
        self.structure.is_some()
            || self.upc.is_some()
            || self.parent_id.is_some()
            || self.title.is_some()
            || self.slug.is_some()
            || self.description.is_some()
            || self.is_public.is_some()
            || self.category_ids.is_some()
    }
}

/// A product attribute value joined with its attribute definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductAttributeSummary {
    pub name: String,
    pub code: String,
    pub value: serde_json::Value,
}

/// A category the product is linked to, with its breadcrumb trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCategorySummary {
    pub category: Category,
    /// Ancestor names joined by " > "
    pub breadcrumbs: String,
}

/// Everything needed to render a product's detail representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product: Product,
    /// Title after falling back to the parent's
    pub display_title: Option<String>,
    pub attributes: Vec<ProductAttributeSummary>,
    pub categories: Vec<ProductCategorySummary>,
    pub images: Vec<ProductImage>,
    /// Ids of child products (parents only)
    pub children: Vec<i64>,
}
