use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::models::{ProductRecord, PromotionRecord};
use crate::normalizer::collect_categories;
use crate::utils::error::AppError;

/// A promotion linked to one constituent of a combined product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromotionMatch {
    pub product_id: String,
    pub promotion: PromotionRecord,
    pub savings: Decimal,
}

impl PromotionMatch {
    /// Savings use the promotion's previous price when it has one, else the listing price.
    pub fn new(product: &ProductRecord, promotion: PromotionRecord) -> Self {
        let savings = match promotion.previous_price {
            Some(_) => promotion.savings(),
            None => promotion.savings_against(product.price),
        };
        Self {
            product_id: product.id.clone(),
            promotion,
            savings,
        }
    }
}

/// Cross-store aggregation of listings judged to be the same product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CombinedProduct {
    pub id: String,
    pub name: String,
    pub constituents: Vec<ProductRecord>,
    pub primary_index: usize,
    pub lowest_price: Decimal,
    pub highest_price: Decimal,
    pub promotions: Vec<PromotionMatch>,
}

impl CombinedProduct {
    pub fn new(
        id: String,
        name: String,
        constituents: Vec<ProductRecord>,
        promotions: Vec<PromotionMatch>,
    ) -> Result<Self, AppError> {
        if constituents.is_empty() {
            return Err(AppError::EmptyGroup);
        }

        let primary_index = constituents
            .iter()
            .position(|p| p.image().is_some())
            .unwrap_or(0);

        // Zero is what an unparseable price decodes to; ignore it while a real price exists.
        let priced: Vec<Decimal> = constituents
            .iter()
            .map(|p| p.price)
            .filter(|price| *price > Decimal::ZERO)
            .collect();
        let lowest_price = priced.iter().copied().min().unwrap_or(Decimal::ZERO);
        let highest_price = priced.iter().copied().max().unwrap_or(Decimal::ZERO);

        Ok(Self {
            id,
            name,
            constituents,
            primary_index,
            lowest_price,
            highest_price,
            promotions,
        })
    }

    /// The constituent whose image represents the group.
    pub fn primary(&self) -> &ProductRecord {
        &self.constituents[self.primary_index]
    }

    pub fn primary_image(&self) -> Option<&str> {
        self.primary().image()
    }

    /// Earliest constituent carrying the lowest price.
    pub fn cheapest(&self) -> &ProductRecord {
        self.constituents
            .iter()
            .find(|p| p.price == self.lowest_price)
            .unwrap_or_else(|| self.primary())
    }

    /// What a shopper saves by buying at the cheapest store rather than the dearest.
    pub fn store_savings(&self) -> Decimal {
        self.highest_price - self.lowest_price
    }

    pub fn savings_percentage(&self) -> Option<f64> {
        if self.highest_price <= Decimal::ZERO || self.constituents.len() < 2 {
            return None;
        }
        (self.store_savings() / self.highest_price * Decimal::from(100)).to_f64()
    }

    /// The matched promotion with the largest savings; earliest wins ties.
    pub fn best_promotion(&self) -> Option<&PromotionMatch> {
        self.promotions.iter().fold(None, |best, candidate| match best {
            Some(current) if current.savings >= candidate.savings => Some(current),
            _ => Some(candidate),
        })
    }

    pub fn promotion_savings(&self) -> Decimal {
        self.best_promotion()
            .map(|m| m.savings)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn stores(&self) -> Vec<&str> {
        self.constituents.iter().map(|p| p.store.as_str()).collect()
    }

    pub fn categories(&self) -> Vec<String> {
        collect_categories(
            self.constituents
                .iter()
                .flat_map(|p| p.categories.iter().map(|c| Some(c.as_str()))),
        )
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.constituents.iter().any(|p| p.has_category(category))
    }

    /// Constituents back as a flat list, in group order.
    pub fn into_constituents(self) -> Vec<ProductRecord> {
        self.constituents
    }
}
