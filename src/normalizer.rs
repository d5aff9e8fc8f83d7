use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

static DEFAULT_NORMALIZER: LazyLock<StoreNormalizer> = LazyLock::new(StoreNormalizer::default);

/// One alias rule: a store name containing any of `patterns` maps to `canonical`.
///
/// Single-character patterns only match a whole word, so "u" catches
/// "Super U" or "U" but not every name that happens to contain the letter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreAlias {
    pub canonical: String,
    pub patterns: Vec<String>,
}

impl StoreAlias {
    pub fn new(canonical: &str, patterns: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| {
            if pattern.chars().count() == 1 {
                name.split(|c: char| !c.is_alphanumeric())
                    .any(|word| word == pattern)
            } else {
                name.contains(pattern.as_str())
            }
        })
    }
}

/// Best-effort canonicalization of retailer names.
///
/// Rules are checked in order and the first hit wins. This is a heuristic,
/// not a dictionary: a retailer whose names none of the rules catch passes
/// through lower-cased and trimmed, so a new chain needs a new alias rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNormalizer {
    aliases: Vec<StoreAlias>,
}

impl StoreNormalizer {
    pub fn new(aliases: Vec<StoreAlias>) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &[StoreAlias] {
        &self.aliases
    }

    pub fn normalize(&self, raw: &str) -> String {
        let name = raw.trim().to_lowercase();
        self.aliases
            .iter()
            .find(|alias| alias.matches(&name))
            .map(|alias| alias.canonical.clone())
            .unwrap_or(name)
    }

    pub fn same_store(&self, a: &str, b: &str) -> bool {
        self.normalize(a) == self.normalize(b)
    }
}

impl Default for StoreNormalizer {
    fn default() -> Self {
        Self::new(default_store_aliases())
    }
}

pub fn default_store_aliases() -> Vec<StoreAlias> {
    vec![
        StoreAlias::new("winners", &["winner"]),
        StoreAlias::new("kingsaver", &["king", "saver"]),
        StoreAlias::new("superu", &["super", "u"]),
    ]
}

/// Canonical store token using the built-in alias rules.
pub fn normalize_store_name(raw: &str) -> String {
    DEFAULT_NORMALIZER.normalize(raw)
}

/// "dAIRY " -> "Dairy". Empty input stays empty.
pub fn normalize_category(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Lower-cased, trimmed, single-spaced product name used as the grouping key.
pub fn normalize_product_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sorted, de-duplicated display categories; absent and blank entries are skipped.
pub fn collect_categories<'a, I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    raw.into_iter()
        .flatten()
        .map(normalize_category)
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
