use std::sync::Arc;

use crate::models::{Item, ProductRecord, PromotionRecord};
use crate::normalizer::{StoreNormalizer, normalize_product_name};

/// Decides whether two product names refer to the same item.
///
/// Grouping and promotion lookup only go through this trait, so the
/// substring rule can be replaced by token overlap or edit distance.
pub trait NameMatcher: Send + Sync {
    fn name(&self) -> &str;
    fn names_match(&self, a: &str, b: &str) -> bool;
}

/// Case-insensitive, bidirectional substring containment over names with
/// whitespace collapsed, the same form grouping keys use.
///
/// Permissive: "Basmati Rice" matches "Basmati Rice 1kg", but a
/// short name like "Rice" matches everything containing "rice". Blank names
/// never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl NameMatcher for SubstringMatcher {
    fn name(&self) -> &str {
        "substring"
    }

    fn names_match(&self, a: &str, b: &str) -> bool {
        let a = normalize_product_name(a);
        let b = normalize_product_name(b);
        if a.is_empty() || b.is_empty() {
            return false;
        }
        a.contains(&b) || b.contains(&a)
    }
}

/// Store-aware matching of listings, promotions and catalog keywords.
#[derive(Clone)]
pub struct Matcher {
    names: Arc<dyn NameMatcher>,
    stores: StoreNormalizer,
}

impl Matcher {
    pub fn new(names: Arc<dyn NameMatcher>, stores: StoreNormalizer) -> Self {
        Self { names, stores }
    }

    pub fn stores(&self) -> &StoreNormalizer {
        &self.stores
    }

    pub fn names_match(&self, a: &str, b: &str) -> bool {
        self.names.names_match(a, b)
    }

    /// True if `name` matches any keyword; stops at the first hit.
    pub fn is_in_catalog<S: AsRef<str>>(&self, name: &str, catalog: &[S]) -> bool {
        catalog
            .iter()
            .any(|keyword| self.names.names_match(name, keyword.as_ref()))
    }

    /// First promotion, in input order, at the same canonical store with a matching name.
    ///
    /// When several promotions at one store match a loose name, the earlier
    /// one wins. That is deterministic, not necessarily the best deal.
    pub fn find_promotion_for_product<'a>(
        &self,
        product: &ProductRecord,
        promotions: &'a [PromotionRecord],
    ) -> Option<&'a PromotionRecord> {
        let store = self.stores.normalize(&product.store);
        promotions.iter().find(|promotion| {
            self.stores.normalize(&promotion.store) == store
                && self.names.names_match(&product.name, &promotion.name)
        })
    }

    pub fn item_matches_query(&self, item: &Item, query: &str) -> bool {
        match item {
            Item::Product(product) => {
                self.names.names_match(&product.name, query)
                    || product
                        .brand
                        .as_deref()
                        .is_some_and(|brand| self.names.names_match(brand, query))
            }
            Item::Promotion(promotion) => self.names.names_match(&promotion.name, query),
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(Arc::new(SubstringMatcher), StoreNormalizer::default())
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("names", &self.names.name())
            .field("stores", &self.stores)
            .finish()
    }
}

/// Bidirectional substring match with the default matcher.
pub fn names_match(a: &str, b: &str) -> bool {
    SubstringMatcher.names_match(a, b)
}

pub fn is_in_catalog<S: AsRef<str>>(name: &str, catalog: &[S]) -> bool {
    Matcher::default().is_in_catalog(name, catalog)
}

pub fn find_promotion_for_product<'a>(
    product: &ProductRecord,
    promotions: &'a [PromotionRecord],
) -> Option<&'a PromotionRecord> {
    Matcher::default().find_promotion_for_product(product, promotions)
}
