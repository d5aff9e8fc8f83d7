//! Partitioning of per-store listings into combined products.
//!
//! Substring equivalence is not transitive ("Milk" ⊂ "Fresh Milk" ⊂
//! "Fresh Milk 1L" says nothing about "Milk" and "Milk Powder"), so
//! grouping uses first-seen-wins: each listing is compared only with the
//! representative (first listing) of every existing group, in group
//! creation order, and joins the first group whose representative matches.
//! That keeps the partition deterministic for a fixed input order and the
//! cost at O(n·g). Regrouping the flattened output reproduces the same
//! partition.
//!
//! Pathological over-merging on very short names ("Oil") is possible and
//! should be checked against bulk data.

use tracing::debug;

use crate::matcher::Matcher;
use crate::models::{CombinedProduct, ProductRecord, PromotionMatch, PromotionRecord, stable_id};
use crate::normalizer::normalize_product_name;
use crate::utils::error::AppError;

struct Group {
    key: String,
    representative: String,
    members: Vec<ProductRecord>,
}

pub struct GroupingEngine {
    matcher: Matcher,
}

impl GroupingEngine {
    pub fn new(matcher: Matcher) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Partition listings without promotion data.
    pub fn group(&self, products: &[ProductRecord]) -> Vec<CombinedProduct> {
        self.group_with_promotions(products, &[])
    }

    /// Partition listings and link each constituent to its promotion, if any.
    ///
    /// Every input listing ends up in exactly one output group.
    pub fn group_with_promotions(
        &self,
        products: &[ProductRecord],
        promotions: &[PromotionRecord],
    ) -> Vec<CombinedProduct> {
        let mut groups: Vec<Group> = Vec::new();

        for product in products {
            match groups
                .iter_mut()
                .find(|g| self.matcher.names_match(&g.representative, &product.name))
            {
                Some(group) => group.members.push(product.clone()),
                None => groups.push(Group {
                    key: normalize_product_name(&product.name),
                    representative: product.name.clone(),
                    members: vec![product.clone()],
                }),
            }
        }

        debug!(
            products = products.len(),
            groups = groups.len(),
            "grouped listings"
        );

        let mut seen_keys: Vec<String> = Vec::with_capacity(groups.len());
        groups
            .into_iter()
            .filter_map(|group| {
                let id = self.group_id(&group.key, &mut seen_keys);
                self.build(id, group, promotions).ok()
            })
            .collect()
    }

    // Two groups can share a key when the same name appears in groups that
    // did not merge (only possible with a non-reflexive matcher); suffix to
    // keep ids unique.
    fn group_id(&self, key: &str, seen: &mut Vec<String>) -> String {
        let occurrences = seen.iter().filter(|k| k.as_str() == key).count();
        seen.push(key.to_string());
        if occurrences == 0 {
            stable_id(key)
        } else {
            stable_id(&format!("{}#{}", key, occurrences))
        }
    }

    fn build(
        &self,
        id: String,
        group: Group,
        promotions: &[PromotionRecord],
    ) -> Result<CombinedProduct, AppError> {
        let matches = group
            .members
            .iter()
            .filter_map(|member| {
                self.matcher
                    .find_promotion_for_product(member, promotions)
                    .map(|promotion| PromotionMatch::new(member, promotion.clone()))
            })
            .collect();

        let name = group.representative.trim().to_string();
        CombinedProduct::new(id, name, group.members, matches)
    }
}

impl Default for GroupingEngine {
    fn default() -> Self {
        Self::new(Matcher::default())
    }
}

/// Groups listings with the default matcher.
pub fn group_products(products: &[ProductRecord]) -> Vec<CombinedProduct> {
    GroupingEngine::default().group(products)
}

/// Flattens groups back into listings, preserving group order.
pub fn flatten_groups(groups: Vec<CombinedProduct>) -> Vec<ProductRecord> {
    groups
        .into_iter()
        .flat_map(CombinedProduct::into_constituents)
        .collect()
}
