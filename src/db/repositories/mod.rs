//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific catalogue entity.

pub mod attribute;
pub mod attribute_value;
pub mod category;
pub mod image;
pub mod product;
pub mod stock_record;

pub use attribute::{AttributeRepository, SqlxAttributeRepository};
pub use attribute_value::{AttributeValueRepository, SqlxAttributeValueRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use image::{ImageRepository, SqlxImageRepository};
pub use product::{ProductRepository, SqlxProductRepository};
pub use stock_record::{SqlxStockRecordRepository, StockRecordRepository};
