use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{ProductRecord, PromotionRecord};

/// A catalog listing or a promotion, for code that handles both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Item {
    Product(ProductRecord),
    Promotion(PromotionRecord),
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::Product(p) => &p.id,
            Item::Promotion(p) => &p.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Item::Product(p) => &p.name,
            Item::Promotion(p) => &p.name,
        }
    }

    pub fn store(&self) -> &str {
        match self {
            Item::Product(p) => &p.store,
            Item::Promotion(p) => &p.store,
        }
    }

    /// The price a shopper pays today.
    pub fn price(&self) -> Decimal {
        match self {
            Item::Product(p) => p.price,
            Item::Promotion(p) => p.new_price,
        }
    }

    pub fn categories(&self) -> Vec<&str> {
        match self {
            Item::Product(p) => p.categories.iter().map(String::as_str).collect(),
            Item::Promotion(p) => p.category.as_deref().into_iter().collect(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Item::Product(_) => "product",
            Item::Promotion(_) => "promotion",
        }
    }
}

impl From<ProductRecord> for Item {
    fn from(product: ProductRecord) -> Self {
        Item::Product(product)
    }
}

impl From<PromotionRecord> for Item {
    fn from(promotion: PromotionRecord) -> Self {
        Item::Promotion(promotion)
    }
}
