use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::normalizer::{StoreNormalizer, normalize_category};
use crate::price::parse_price;
use crate::utils::error::AppError;

/// Outcome of a best-effort external classification.
///
/// A fallback is never a confident answer; callers must match on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Classification<T> {
    Classified { value: T, confidence: f32 },
    Fallback { value: T, reason: String },
}

impl<T> Classification<T> {
    pub fn value(&self) -> &T {
        match self {
            Classification::Classified { value, .. } => value,
            Classification::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Classification::Classified { value, .. } => value,
            Classification::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Classification::Fallback { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGuess {
    pub label: String,
    pub confidence: f32,
}

/// Structured fields pulled from a receipt line, shelf label or photo.
/// Every field is optional; extraction is best effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProduct {
    pub name: Option<String>,
    pub price: Option<String>,
    pub size: Option<String>,
    pub store: Option<String>,
    pub category: Option<String>,
    pub discount: Option<String>,
}

/// External classification/extraction collaborator.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify_text(&self, text: &str) -> Result<Option<CategoryGuess>, AppError>;
    async fn extract(&self, payload: &[u8]) -> Result<ExtractedProduct, AppError>;
}

/// Extraction result with prices parsed and the store and category canonicalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedExtraction {
    pub name: String,
    pub price: Decimal,
    pub size: String,
    pub store: Option<String>,
    pub category: Classification<String>,
    pub discount: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct CategoryPolicy {
    pub min_confidence: f32,
    pub fallback_category: String,
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            fallback_category: "Uncategorized".to_string(),
        }
    }
}

impl CategoryPolicy {
    /// Turns a raw guess into a display category, or the fallback when the
    /// guess is absent, blank or below the confidence threshold.
    pub fn resolve(&self, guess: Option<CategoryGuess>) -> Classification<String> {
        let reason = match guess {
            Some(g) if g.confidence >= self.min_confidence => {
                let label = normalize_category(&g.label);
                if !label.is_empty() {
                    return Classification::Classified {
                        value: label,
                        confidence: g.confidence,
                    };
                }
                "blank category label".to_string()
            }
            Some(g) => format!(
                "confidence {:.2} below {:.2}",
                g.confidence, self.min_confidence
            ),
            None => "no category returned".to_string(),
        };

        info!(reason = %reason, fallback = %self.fallback_category, "using fallback category");
        Classification::Fallback {
            value: self.fallback_category.clone(),
            reason,
        }
    }

    /// Classifies free text. A classifier failure also resolves to the fallback.
    pub async fn categorize(&self, classifier: &dyn Classifier, text: &str) -> Classification<String> {
        match classifier.classify_text(text).await {
            Ok(guess) => self.resolve(guess),
            Err(err) => {
                debug!(error = %err, "classifier unavailable");
                Classification::Fallback {
                    value: self.fallback_category.clone(),
                    reason: format!("classifier error: {}", err),
                }
            }
        }
    }

    /// Extracts a product from a payload and normalizes what came back.
    ///
    /// Transport errors from the collaborator are returned; missing fields are not.
    pub async fn extract_product(
        &self,
        classifier: &dyn Classifier,
        stores: &StoreNormalizer,
        payload: &[u8],
    ) -> Result<NormalizedExtraction, AppError> {
        let raw = classifier.extract(payload).await?;
        Ok(self.normalize_extraction(raw, stores))
    }

    pub fn normalize_extraction(
        &self,
        raw: ExtractedProduct,
        stores: &StoreNormalizer,
    ) -> NormalizedExtraction {
        let category = match raw.category.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => Classification::Classified {
                value: normalize_category(label),
                confidence: 1.0,
            },
            _ => self.resolve(None),
        };

        NormalizedExtraction {
            name: raw.name.map(|n| n.trim().to_string()).unwrap_or_default(),
            price: parse_price(raw.price.as_deref()),
            size: raw.size.unwrap_or_default(),
            store: raw
                .store
                .filter(|s| !s.trim().is_empty())
                .map(|s| stores.normalize(&s)),
            category,
            discount: raw
                .discount
                .as_deref()
                .map(|d| parse_price(d))
                .filter(|d| *d > Decimal::ZERO),
        }
    }
}
