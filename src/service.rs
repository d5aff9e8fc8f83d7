use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::cache::{CacheState, Clock, Loader, ResourceCache, SystemClock};
use crate::config::AppConfig;
use crate::data_source::DataSource;
use crate::grouping::GroupingEngine;
use crate::matcher::{Matcher, SubstringMatcher};
use crate::models::{CombinedProduct, Item, NewProduct, ProductRecord, PromotionRecord, UpdateProduct};
use crate::normalizer::{collect_categories, normalize_category};
use crate::utils::error::AppError;

/// Read surface for the rendering layer.
///
/// Built once at startup and shared (it is cheap to clone). Grouping and
/// matching are recomputed from the cached snapshot on every read.
///
/// Reads fall back to the last stored snapshot when a refresh fails; the
/// failure is reported through `cache_status`. Only a resource that was
/// never fetched successfully makes a read fail.
#[derive(Clone)]
pub struct ComparisonService {
    source: Arc<dyn DataSource>,
    products: ResourceCache<ProductRecord>,
    promotions: ResourceCache<PromotionRecord>,
    grouping: Arc<GroupingEngine>,
    catalog: Arc<Vec<String>>,
    restrict_promotions: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub products: CacheState,
    pub promotions: CacheState,
    /// Set while products are served from a snapshot after a failed refresh.
    pub products_error: Option<String>,
    pub promotions_error: Option<String>,
}

impl CacheStatus {
    pub fn is_degraded(&self) -> bool {
        self.products_error.is_some() || self.promotions_error.is_some()
    }
}

impl ComparisonService {
    pub fn new(source: Arc<dyn DataSource>, config: &AppConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn DataSource>, config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let product_loader: Loader<ProductRecord> = {
            let source = source.clone();
            Arc::new(move || {
                let source = source.clone();
                async move { source.fetch_products().await }.boxed()
            })
        };
        let promotion_loader: Loader<PromotionRecord> = {
            let source = source.clone();
            Arc::new(move || {
                let source = source.clone();
                async move { source.fetch_promotions().await }.boxed()
            })
        };

        let matcher = Matcher::new(Arc::new(SubstringMatcher), config.store_normalizer());

        Self {
            source,
            products: ResourceCache::with_clock(
                "products",
                config.products_ttl(),
                product_loader,
                clock.clone(),
            ),
            promotions: ResourceCache::with_clock(
                "promotions",
                config.promotions_ttl(),
                promotion_loader,
                clock,
            ),
            grouping: Arc::new(GroupingEngine::new(matcher)),
            catalog: Arc::new(config.catalog.keywords.clone()),
            restrict_promotions: config.catalog.restrict_promotions,
        }
    }

    pub fn matcher(&self) -> &Matcher {
        self.grouping.matcher()
    }

    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    pub async fn cache_status(&self) -> CacheStatus {
        CacheStatus {
            products: self.products.state().await,
            promotions: self.promotions.state().await,
            products_error: self.products.last_error().await.map(|e| e.to_string()),
            promotions_error: self.promotions.last_error().await.map(|e| e.to_string()),
        }
    }

    /// Promotions for enriching product groups. With nothing stored and the
    /// source down, groups are built without promotions.
    async fn promotions_for_grouping(&self) -> Arc<Vec<PromotionRecord>> {
        self.promotions.get_or_stale().await.unwrap_or_else(|err| {
            warn!(error = %err, "promotions unavailable; grouping without promotions");
            Arc::default()
        })
    }

    /// Cross-store product groups, optionally restricted to one category.
    pub async fn get_combined_products(
        &self,
        category_filter: Option<&str>,
    ) -> Result<Vec<CombinedProduct>, AppError> {
        let (products, promotions) =
            tokio::join!(self.products.get_or_stale(), self.promotions_for_grouping());
        let products = products?;

        let groups = self.grouping.group_with_promotions(&products, &promotions);
        let groups: Vec<CombinedProduct> = match category_filter.map(str::trim).filter(|c| !c.is_empty()) {
            Some(category) => groups.into_iter().filter(|g| g.has_category(category)).collect(),
            None => groups,
        };
        debug!(groups = groups.len(), category = ?category_filter, "combined products");
        Ok(groups)
    }

    /// Promotions, optionally filtered by store (canonical comparison) and category.
    ///
    /// With `restrict_promotions` set, only promotions on catalog staples are returned.
    pub async fn get_promotions(
        &self,
        store_filter: Option<&str>,
        category_filter: Option<&str>,
    ) -> Result<Vec<PromotionRecord>, AppError> {
        let promotions = self.promotions.get_or_stale().await?;
        let matcher = self.matcher();
        let store = store_filter
            .filter(|s| !s.trim().is_empty())
            .map(|s| matcher.stores().normalize(s));
        let category = category_filter
            .map(normalize_category)
            .filter(|c| !c.is_empty());

        Ok(promotions
            .iter()
            .filter(|p| !self.restrict_promotions || matcher.is_in_catalog(&p.name, self.catalog.as_slice()))
            .filter(|p| {
                store
                    .as_ref()
                    .is_none_or(|s| matcher.stores().normalize(&p.store) == *s)
            })
            .filter(|p| {
                category.as_ref().is_none_or(|c| {
                    p.category
                        .as_deref()
                        .is_some_and(|pc| normalize_category(pc) == *c)
                })
            })
            .cloned()
            .collect())
    }

    /// Display categories across all cached products.
    pub async fn categories(&self) -> Result<Vec<String>, AppError> {
        let products = self.products.get_or_stale().await?;
        Ok(collect_categories(
            products
                .iter()
                .flat_map(|p| p.categories.iter().map(|c| Some(c.as_str()))),
        ))
    }

    /// Products and promotions whose name (or brand) matches the query.
    pub async fn search(&self, query: &str) -> Result<Vec<Item>, AppError> {
        let (products, promotions) = tokio::join!(self.products.get_or_stale(), self.promotions.get_or_stale());
        let (products, promotions) = (products?, promotions?);
        let matcher = self.matcher();

        Ok(products
            .iter()
            .cloned()
            .map(Item::Product)
            .chain(promotions.iter().cloned().map(Item::Promotion))
            .filter(|item| matcher.item_matches_query(item, query))
            .collect())
    }

    /// The promotion currently running for a listing, if any.
    pub async fn promotion_for(&self, product: &ProductRecord) -> Result<Option<PromotionRecord>, AppError> {
        let promotions = self.promotions.get_or_stale().await?;
        Ok(self
            .matcher()
            .find_promotion_for_product(product, &promotions)
            .cloned())
    }

    /// Drops both caches and fetches them again, concurrently.
    pub async fn refresh(&self) -> Result<(), AppError> {
        tokio::join!(self.products.invalidate(), self.promotions.invalidate());
        let (products, promotions) = tokio::join!(self.products.fetch(), self.promotions.fetch());
        let products = products?;
        let promotions = promotions?;
        info!(
            products = products.len(),
            promotions = promotions.len(),
            "refreshed"
        );
        Ok(())
    }

    pub async fn add_product(&self, product: NewProduct) -> Result<ProductRecord, AppError> {
        product.validate()?;
        let record = self.source.add_product(product).await?;
        self.products.invalidate().await;
        Ok(record)
    }

    pub async fn update_product(&self, id: &str, update: UpdateProduct) -> Result<ProductRecord, AppError> {
        update.validate()?;
        let record = self.source.update_product(id, update).await?;
        self.products.invalidate().await;
        Ok(record)
    }
}
