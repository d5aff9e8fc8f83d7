// Shared fixtures for the integration tests

pub mod cache_tests;
pub mod comparison_tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pricewise::{
    AppConfig, AppError, Clock, ComparisonService, DataSource, InMemorySource, NewProduct,
    ProductRecord, PromotionRecord, UpdateProduct,
};

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Utc::now())))
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// In-memory source that counts fetches and can be switched offline.
pub struct CountingSource {
    inner: InMemorySource,
    pub product_fetches: AtomicUsize,
    active_product_fetches: AtomicUsize,
    max_product_fetches: AtomicUsize,
    pub promotion_fetches: AtomicUsize,
    pub offline: AtomicBool,
    latency: Duration,
}

impl CountingSource {
    pub fn new(products: Vec<ProductRecord>, promotions: Vec<PromotionRecord>) -> Self {
        Self {
            inner: InMemorySource::new(products, promotions),
            product_fetches: AtomicUsize::new(0),
            active_product_fetches: AtomicUsize::new(0),
            max_product_fetches: AtomicUsize::new(0),
            promotion_fetches: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            latency: Duration::from_millis(20),
        }
    }

    pub fn product_fetches(&self) -> usize {
        self.product_fetches.load(Ordering::SeqCst)
    }

    /// Most product fetches that were running at the same time.
    pub fn max_concurrent_product_fetches(&self) -> usize {
        self.max_product_fetches.load(Ordering::SeqCst)
    }

    pub fn promotion_fetches(&self) -> usize {
        self.promotion_fetches.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Transport("data source unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DataSource for CountingSource {
    async fn fetch_products(&self) -> Result<Vec<ProductRecord>, AppError> {
        self.product_fetches.fetch_add(1, Ordering::SeqCst);
        let active = self.active_product_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_product_fetches.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.active_product_fetches.fetch_sub(1, Ordering::SeqCst);
        self.check_online()?;
        self.inner.fetch_products().await
    }

    async fn fetch_promotions(&self) -> Result<Vec<PromotionRecord>, AppError> {
        self.promotion_fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.check_online()?;
        self.inner.fetch_promotions().await
    }

    async fn add_product(&self, product: NewProduct) -> Result<ProductRecord, AppError> {
        self.check_online()?;
        self.inner.add_product(product).await
    }

    async fn update_product(&self, id: &str, update: UpdateProduct) -> Result<ProductRecord, AppError> {
        self.check_online()?;
        self.inner.update_product(id, update).await
    }
}

pub fn listing(id: &str, name: &str, store: &str, price: i64) -> ProductRecord {
    ProductRecord {
        id: id.to_string(),
        name: name.to_string(),
        brand: None,
        price: Decimal::from(price),
        size: String::new(),
        store: store.to_string(),
        categories: vec!["Dairy".to_string()],
        image: None,
    }
}

pub fn promotion(id: &str, name: &str, store: &str, previous: i64, new: i64) -> PromotionRecord {
    PromotionRecord {
        id: id.to_string(),
        name: name.to_string(),
        store: store.to_string(),
        previous_price: Some(Decimal::from(previous)),
        new_price: Decimal::from(new),
        size: String::new(),
        category: Some("dairy".to_string()),
        created_at: None,
    }
}

pub fn new_product(name: &str, store: &str, price: i64) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        brand: None,
        price: Decimal::from(price),
        size: "1L".to_string(),
        store: store.to_string(),
        categories: vec!["dairy".to_string()],
        image: None,
    }
}

/// Service over a counting source with the default configuration.
pub fn create_test_service(
    products: Vec<ProductRecord>,
    promotions: Vec<PromotionRecord>,
) -> (Arc<CountingSource>, ComparisonService) {
    let source = Arc::new(CountingSource::new(products, promotions));
    let service = ComparisonService::new(source.clone(), &AppConfig::default());
    (source, service)
}

/// Same as `create_test_service`, reading time from `clock`.
pub fn create_clocked_service(
    products: Vec<ProductRecord>,
    promotions: Vec<PromotionRecord>,
    clock: Arc<ManualClock>,
) -> (Arc<CountingSource>, ComparisonService) {
    let source = Arc::new(CountingSource::new(products, promotions));
    let service = ComparisonService::with_clock(source.clone(), &AppConfig::default(), clock);
    (source, service)
}
