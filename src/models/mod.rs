//! Data models
//!
//! Catalogue entities as stored in the database, plus the input types the
//! services accept for creating and updating them.

mod attribute;
mod category;
mod image;
mod money;
mod pagination;
mod product;
mod stock_record;

use serde::{Deserialize, Deserializer};

pub use attribute::{
    is_valid_attribute_code, AttributeType, CreateAttributeInput, CreateAttributeValueInput,
    ProductAttribute, ProductAttributeValue, UpdateAttributeInput, UpdateAttributeValueInput,
};
pub use category::{
    breadcrumbs, full_slug, split_slug_path, Category, CreateCategoryInput, UpdateCategoryInput,
    BREADCRUMB_SEPARATOR, SLUG_PATH_SEPARATOR,
};
pub use image::{CreateImageInput, ProductImage, UpdateImageInput};
pub use money::{Money, MoneyParseError};
pub use pagination::{ListParams, PagedResult, MAX_PAGE_SIZE};
pub use product::{
    CreateProductInput, Product, ProductAttributeSummary, ProductCategorySummary, ProductDetail,
    ProductStructure, UpdateProductInput,
};
pub use stock_record::{CreateStockRecordInput, StockRecord, UpdateStockRecordInput};

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Combined with `#[serde(default)]`: absent gives `None`, `null` gives
/// `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
