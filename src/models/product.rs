use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::generate_id;
use crate::normalizer::normalize_category;
use crate::price::deserialize_price;

/// One store's listing of one item. Replaced wholesale on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Decimal,
    #[serde(default)]
    pub size: String,
    #[serde(alias = "store_name")]
    pub store: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, alias = "image_url")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, message = "product name must not be empty"))]
    pub name: String,
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Decimal,
    #[serde(default)]
    pub size: String,
    #[validate(length(min = 1, message = "store must not be empty"))]
    pub store: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProduct {
    #[validate(length(min = 1, message = "product name must not be empty"))]
    pub name: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    pub size: Option<String>,
    #[validate(length(min = 1, message = "store must not be empty"))]
    pub store: Option<String>,
    pub categories: Option<Vec<String>>,
    pub image: Option<String>,
}

impl ProductRecord {
    pub fn new(new_product: NewProduct) -> Self {
        Self {
            id: generate_id(),
            name: new_product.name,
            brand: new_product.brand,
            price: new_product.price,
            size: new_product.size,
            store: new_product.store,
            categories: new_product.categories,
            image: new_product.image,
        }
    }

    pub fn update(&mut self, update: UpdateProduct) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(brand) = update.brand {
            self.brand = Some(brand);
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(size) = update.size {
            self.size = size;
        }
        if let Some(store) = update.store {
            self.store = store;
        }
        if let Some(categories) = update.categories {
            self.categories = categories;
        }
        if let Some(image) = update.image {
            self.image = Some(image);
        }
    }

    /// Image reference, treating blank strings as absent.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn has_category(&self, category: &str) -> bool {
        let wanted = normalize_category(category);
        self.categories
            .iter()
            .any(|c| normalize_category(c) == wanted)
    }
}
