pub mod cache;
pub mod classification;
pub mod config;
pub mod data_source;
pub mod grouping;
pub mod matcher;
pub mod models;
pub mod normalizer;
pub mod price;
pub mod service;
pub mod utils;

// Re-export commonly used types
pub use cache::{CacheEntry, CacheState, Clock, ResourceCache, SystemClock};
pub use config::AppConfig;
pub use data_source::{DataSource, InMemorySource, JsonFileSource};
pub use grouping::{GroupingEngine, flatten_groups, group_products};
pub use matcher::{Matcher, NameMatcher, SubstringMatcher, find_promotion_for_product, is_in_catalog, names_match};
pub use models::{CombinedProduct, Item, NewProduct, ProductRecord, PromotionRecord, UpdateProduct};
pub use normalizer::{StoreNormalizer, normalize_category, normalize_store_name};
pub use price::{format_price, is_valid_price_text, parse_price};
pub use service::ComparisonService;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
