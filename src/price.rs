use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use std::sync::LazyLock;

static DEFAULT_PARSER: LazyLock<PriceParser> = LazyLock::new(PriceParser::new);

/// A price as it arrives from a listing, a promotion or an extraction result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceInput<'a> {
    Number(f64),
    Decimal(Decimal),
    Text(&'a str),
    Missing,
}

impl From<f64> for PriceInput<'_> {
    fn from(value: f64) -> Self {
        PriceInput::Number(value)
    }
}

impl From<i64> for PriceInput<'_> {
    fn from(value: i64) -> Self {
        PriceInput::Decimal(Decimal::from(value))
    }
}

impl From<i32> for PriceInput<'_> {
    fn from(value: i32) -> Self {
        PriceInput::Decimal(Decimal::from(value))
    }
}

impl From<Decimal> for PriceInput<'_> {
    fn from(value: Decimal) -> Self {
        PriceInput::Decimal(value)
    }
}

impl<'a> From<&'a str> for PriceInput<'a> {
    fn from(value: &'a str) -> Self {
        PriceInput::Text(value)
    }
}

impl<'a> From<&'a String> for PriceInput<'a> {
    fn from(value: &'a String) -> Self {
        PriceInput::Text(value.as_str())
    }
}

impl<'a, T: Into<PriceInput<'a>>> From<Option<T>> for PriceInput<'a> {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PriceInput::Missing)
    }
}

/// Lenient price parsing for grocery listings.
///
/// Currency markers (Rs, Rs., MUR, ₨, $, €, £) and whitespace are stripped.
/// A single comma followed by one or two digits is read as the decimal
/// separator ("12,50" is 12.5); any other comma is a thousands separator.
pub struct PriceParser {
    currency_regex: Regex,
    price_text_regex: Regex,
    decimal_comma_regex: Regex,
}

impl PriceParser {
    pub fn new() -> Self {
        PriceParser {
            currency_regex: Regex::new(r"(?i)rs\.?|mur|₨|[\$€£]").unwrap(),
            price_text_regex: Regex::new(r"^[0-9,]+$").unwrap(),
            decimal_comma_regex: Regex::new(r"^\d+,\d{1,2}$").unwrap(),
        }
    }

    fn strip(&self, raw: &str) -> String {
        self.currency_regex
            .replace_all(raw, "")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    }

    /// Parses a price, returning `None` when the text holds no number.
    pub fn parse_strict(&self, raw: &str) -> Option<Decimal> {
        let stripped = self.strip(raw);
        if stripped.is_empty() {
            return None;
        }

        let numeric = if self.decimal_comma_regex.is_match(&stripped) {
            stripped.replace(',', ".")
        } else {
            stripped.replace(',', "")
        };

        Decimal::from_str(&numeric).ok()
    }

    pub fn parse(&self, raw: PriceInput<'_>) -> Decimal {
        match raw {
            PriceInput::Number(value) => decimal_from_f64(value).unwrap_or(Decimal::ZERO),
            PriceInput::Decimal(value) => value,
            PriceInput::Text(text) => self.parse_strict(text).unwrap_or(Decimal::ZERO),
            PriceInput::Missing => Decimal::ZERO,
        }
    }

    pub fn format(&self, raw: PriceInput<'_>) -> String {
        match raw {
            PriceInput::Number(value) => match decimal_from_f64(value) {
                Some(d) => two_places(d),
                None => value.to_string(),
            },
            PriceInput::Decimal(value) => two_places(value),
            PriceInput::Text(text) => match self.parse_strict(text) {
                Some(d) => two_places(d),
                None => text.to_string(),
            },
            PriceInput::Missing => two_places(Decimal::ZERO),
        }
    }

    pub fn is_valid_text(&self, raw: &str) -> bool {
        let stripped = self.strip(raw);
        self.price_text_regex.is_match(&stripped) && !stripped.ends_with(',')
    }
}

impl Default for PriceParser {
    fn default() -> Self {
        Self::new()
    }
}

fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    // Display gives the shortest round-tripping form, so 12.99 stays 12.99.
    Decimal::from_str(&value.to_string())
        .ok()
        .or_else(|| Decimal::try_from(value).ok())
}

fn two_places(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Parses any raw price into a number; unparseable or missing input is zero.
pub fn parse_price<'a>(raw: impl Into<PriceInput<'a>>) -> Decimal {
    DEFAULT_PARSER.parse(raw.into())
}

/// Renders a price with exactly two decimals, or the raw text when it is not numeric.
pub fn format_price<'a>(raw: impl Into<PriceInput<'a>>) -> String {
    DEFAULT_PARSER.format(raw.into())
}

/// Accepts digits and commas (after currency markers), rejecting a trailing comma.
pub fn is_valid_price_text(raw: &str) -> bool {
    DEFAULT_PARSER.is_valid_text(raw)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(f64),
    Text(String),
}

impl RawPrice {
    fn into_decimal(self) -> Decimal {
        match self {
            RawPrice::Number(n) => parse_price(n),
            RawPrice::Text(s) => parse_price(s.as_str()),
        }
    }
}

/// Serde helper: accepts a number, a price string or null.
pub fn deserialize_price<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawPrice>::deserialize(deserializer)?;
    Ok(raw.map(RawPrice::into_decimal).unwrap_or(Decimal::ZERO))
}

/// Serde helper for optional prices; null and absent stay `None`.
pub fn deserialize_optional_price<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawPrice>::deserialize(deserializer)?;
    Ok(raw.map(RawPrice::into_decimal))
}
