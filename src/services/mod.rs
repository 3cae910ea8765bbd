//! Services layer - Business logic
//!
//! Services are responsible for:
//! - Implementing catalogue rules (product structure, category tree, typed attributes)
//! - Coordinating between repositories and cache
//! - Handling validation and error cases

pub mod attribute;
pub mod category;
pub mod image;
pub mod pricing;
pub mod product;
pub mod stock_record;

pub use attribute::{AttributeService, AttributeServiceError, AttributeValueService};
pub use category::{generate_slug, CategoryService, CategoryServiceError};
pub use image::{ImageService, ImageServiceError};
pub use pricing::{PricingService, PricingServiceError};
pub use product::{ProductService, ProductServiceError};
pub use stock_record::{normalize_currency, StockRecordService, StockRecordServiceError};
