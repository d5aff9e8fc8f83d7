use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize};

use crate::price::{deserialize_optional_price, deserialize_price};

/// A time-bound discounted price at one store.
///
/// `new_price <= previous_price` is expected but not enforced; savings clamp at zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromotionRecord {
    pub id: String,
    pub name: String,
    #[serde(alias = "store_name")]
    pub store: String,
    #[serde(default, deserialize_with = "deserialize_optional_price")]
    pub previous_price: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub new_price: Decimal,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PromotionRecord {
    /// `max(0, previous - new)`, or zero when there is no previous price.
    pub fn savings(&self) -> Decimal {
        match self.previous_price {
            Some(previous) => (previous - self.new_price).max(Decimal::ZERO),
            None => Decimal::ZERO,
        }
    }

    /// Savings measured against an arbitrary reference price, e.g. a catalog listing.
    pub fn savings_against(&self, reference: Decimal) -> Decimal {
        (reference - self.new_price).max(Decimal::ZERO)
    }

    pub fn discount_percentage(&self) -> Option<f64> {
        let previous = self.previous_price?;
        if previous <= Decimal::ZERO {
            return None;
        }
        (self.savings() / previous * Decimal::from(100)).to_f64()
    }

    pub fn display_date(&self) -> String {
        self.created_at
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Parses RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`; anything else is `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}
