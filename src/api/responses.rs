//! Shared API response types
//!
//! JSON representations of catalogue entities. Related resources are linked by
//! relative URLs under `/api/v1`.

use serde::Serialize;

use super::common::api_url;
use crate::models::{
    Category, Money, PagedResult, Product, ProductAttribute, ProductAttributeSummary,
    ProductAttributeValue, ProductCategorySummary, ProductDetail, ProductImage, StockRecord,
};

// ============================================================================
// Pagination
// ============================================================================

/// Paginated list response
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub results: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn from_paged<U: Into<T>>(paged: PagedResult<U>) -> Self {
        let total_pages = paged.total_pages();
        Self {
            total: paged.total,
            page: paged.page,
            page_size: paged.per_page,
            total_pages,
            results: paged.items.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Products
// ============================================================================

fn product_url(id: i64) -> String {
    api_url(&["products", &id.to_string()])
}

/// Product as it appears in listings
#[derive(Debug, Serialize)]
pub struct ProductLinkResponse {
    pub id: i64,
    pub url: String,
    pub upc: Option<String>,
    pub title: Option<String>,
    pub structure: String,
    pub price: String,
    pub availability: String,
}

impl From<Product> for ProductLinkResponse {
    fn from(product: Product) -> Self {
        let id = product.id.to_string();
        Self {
            url: product_url(product.id),
            price: api_url(&["products", &id, "price"]),
            availability: api_url(&["products", &id, "availability"]),
            id: product.id,
            upc: product.upc,
            title: product.title,
            structure: product.structure.to_string(),
        }
    }
}

/// Category linked from a product, with its breadcrumb trail
#[derive(Debug, Serialize)]
pub struct ProductCategoryResponse {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub slug: String,
    pub breadcrumbs: String,
}

impl From<ProductCategorySummary> for ProductCategoryResponse {
    fn from(summary: ProductCategorySummary) -> Self {
        Self {
            id: summary.category.id,
            url: category_url(summary.category.id),
            name: summary.category.name,
            slug: summary.category.slug,
            breadcrumbs: summary.breadcrumbs,
        }
    }
}

/// Full product representation
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub url: String,
    pub structure: String,
    pub upc: Option<String>,
    /// Display title; children without a title show their parent's
    pub title: Option<String>,
    pub slug: String,
    pub description: String,
    pub is_public: bool,
    pub date_created: String,
    pub date_updated: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub attributes: Vec<ProductAttributeSummary>,
    pub categories: Vec<ProductCategoryResponse>,
    pub images: Vec<ImageResponse>,
    pub price: String,
    pub availability: String,
    pub stockrecords: String,
}

impl From<ProductDetail> for ProductResponse {
    fn from(detail: ProductDetail) -> Self {
        let product = detail.product;
        let id = product.id.to_string();
        Self {
            id: product.id,
            url: product_url(product.id),
            structure: product.structure.to_string(),
            upc: product.upc,
            title: detail.display_title,
            slug: product.slug,
            description: product.description,
            is_public: product.is_public,
            date_created: product.date_created.to_rfc3339(),
            date_updated: product.date_updated.to_rfc3339(),
            parent: product.parent_id.map(product_url),
            children: detail.children.into_iter().map(product_url).collect(),
            attributes: detail.attributes,
            categories: detail.categories.into_iter().map(Into::into).collect(),
            images: detail.images.into_iter().map(Into::into).collect(),
            price: api_url(&["products", &id, "price"]),
            availability: api_url(&["products", &id, "availability"]),
            stockrecords: api_url(&["products", &id, "stockrecords"]),
        }
    }
}

// ============================================================================
// Categories
// ============================================================================

fn category_url(id: i64) -> String {
    api_url(&["categories", &id.to_string()])
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent: Option<String>,
    pub sort_order: i32,
    pub is_public: bool,
    pub created_at: String,
    /// Only filled in on the detail endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breadcrumbs: Option<String>,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            url: category_url(category.id),
            name: category.name,
            slug: category.slug,
            description: category.description,
            parent: category.parent_id.map(category_url),
            sort_order: category.sort_order,
            is_public: category.is_public,
            created_at: category.created_at.to_rfc3339(),
            breadcrumbs: None,
        }
    }
}

// ============================================================================
// Attributes
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AttributeResponse {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub attr_type: String,
    pub required: bool,
}

impl From<ProductAttribute> for AttributeResponse {
    fn from(attribute: ProductAttribute) -> Self {
        Self {
            id: attribute.id,
            url: api_url(&["attributes", &attribute.id.to_string()]),
            name: attribute.name,
            code: attribute.code,
            attr_type: attribute.attr_type.to_string(),
            required: attribute.required,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttributeValueResponse {
    pub id: i64,
    pub url: String,
    pub product_id: i64,
    pub product: String,
    pub attribute_id: i64,
    pub attribute: String,
    pub value: serde_json::Value,
}

impl From<ProductAttributeValue> for AttributeValueResponse {
    fn from(value: ProductAttributeValue) -> Self {
        Self {
            id: value.id,
            url: api_url(&["attribute-values", &value.id.to_string()]),
            product_id: value.product_id,
            product: product_url(value.product_id),
            attribute_id: value.attribute_id,
            attribute: api_url(&["attributes", &value.attribute_id.to_string()]),
            value: value.value,
        }
    }
}

// ============================================================================
// Images
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: i64,
    pub url: String,
    pub product_id: i64,
    pub original: String,
    pub caption: String,
    pub display_order: i32,
    pub date_created: String,
}

impl From<ProductImage> for ImageResponse {
    fn from(image: ProductImage) -> Self {
        Self {
            id: image.id,
            url: api_url(&["images", &image.id.to_string()]),
            product_id: image.product_id,
            original: image.original,
            caption: image.caption,
            display_order: image.display_order,
            date_created: image.date_created.to_rfc3339(),
        }
    }
}

// ============================================================================
// Stock records
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StockRecordResponse {
    pub id: i64,
    pub url: String,
    pub product_id: i64,
    pub product: String,
    pub partner: String,
    pub partner_sku: String,
    pub price_currency: String,
    pub price: Option<Money>,
    pub num_in_stock: Option<i64>,
    pub num_allocated: Option<i64>,
    pub low_stock_threshold: Option<i64>,
    pub date_created: String,
    pub date_updated: String,
}

impl From<StockRecord> for StockRecordResponse {
    fn from(record: StockRecord) -> Self {
        Self {
            id: record.id,
            url: api_url(&["stockrecords", &record.id.to_string()]),
            product_id: record.product_id,
            product: product_url(record.product_id),
            partner: record.partner,
            partner_sku: record.partner_sku,
            price_currency: record.price_currency,
            price: record.price,
            num_in_stock: record.num_in_stock,
            num_allocated: record.num_allocated,
            low_stock_threshold: record.low_stock_threshold,
            date_created: record.date_created.to_rfc3339(),
            date_updated: record.date_updated.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListParams, ProductStructure};
    use chrono::Utc;

    fn product(id: i64, structure: ProductStructure) -> Product {
        let now = Utc::now();
        Product {
            id,
            structure,
            upc: Some("0001".to_string()),
            parent_id: None,
            title: Some("Lamp".to_string()),
            slug: "lamp".to_string(),
            description: String::new(),
            is_public: true,
            date_created: now,
            date_updated: now,
        }
    }

    #[test]
    fn test_product_link_urls() {
        let link = ProductLinkResponse::from(product(7, ProductStructure::Standalone));
        assert_eq!(link.url, "/api/v1/products/7");
        assert_eq!(link.price, "/api/v1/products/7/price");
        assert_eq!(link.availability, "/api/v1/products/7/availability");
        assert_eq!(link.structure, "standalone");
    }

    #[test]
    fn test_product_detail_links_children() {
        let detail = ProductDetail {
            product: product(1, ProductStructure::Parent),
            display_title: Some("Lamp".to_string()),
            attributes: vec![],
            categories: vec![],
            images: vec![],
            children: vec![2, 3],
        };
        let response = ProductResponse::from(detail);
        assert_eq!(response.children, vec!["/api/v1/products/2", "/api/v1/products/3"]);
        assert_eq!(response.stockrecords, "/api/v1/products/1/stockrecords");
        assert!(response.parent.is_none());
    }

    #[test]
    fn test_paginated_response() {
        let params = ListParams::new(2, 1);
        let paged = PagedResult::new(vec![product(5, ProductStructure::Standalone)], 3, &params);
        let response: PaginatedResponse<ProductLinkResponse> = PaginatedResponse::from_paged(paged);
        assert_eq!(response.total, 3);
        assert_eq!(response.page, 2);
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.results[0].id, 5);
    }
}
