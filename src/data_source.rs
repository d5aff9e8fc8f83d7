use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;
use validator::Validate;

use crate::models::{NewProduct, ProductRecord, PromotionRecord, UpdateProduct};
use crate::utils::error::AppError;

/// Where product and promotion records come from.
///
/// A successful write must be followed by invalidating the product cache;
/// `ComparisonService` does that for its own writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch_products(&self) -> Result<Vec<ProductRecord>, AppError>;
    async fn fetch_promotions(&self) -> Result<Vec<PromotionRecord>, AppError>;
    async fn add_product(&self, product: NewProduct) -> Result<ProductRecord, AppError>;
    async fn update_product(&self, id: &str, update: UpdateProduct) -> Result<ProductRecord, AppError>;
}

/// Records held in memory; writes are visible to the next fetch.
#[derive(Default)]
pub struct InMemorySource {
    products: RwLock<Vec<ProductRecord>>,
    promotions: RwLock<Vec<PromotionRecord>>,
}

impl InMemorySource {
    pub fn new(products: Vec<ProductRecord>, promotions: Vec<PromotionRecord>) -> Self {
        Self {
            products: RwLock::new(products),
            promotions: RwLock::new(promotions),
        }
    }

    pub async fn set_promotions(&self, promotions: Vec<PromotionRecord>) {
        *self.promotions.write().await = promotions;
    }
}

#[async_trait]
impl DataSource for InMemorySource {
    async fn fetch_products(&self) -> Result<Vec<ProductRecord>, AppError> {
        Ok(self.products.read().await.clone())
    }

    async fn fetch_promotions(&self) -> Result<Vec<PromotionRecord>, AppError> {
        Ok(self.promotions.read().await.clone())
    }

    async fn add_product(&self, product: NewProduct) -> Result<ProductRecord, AppError> {
        product.validate()?;
        let record = ProductRecord::new(product);
        self.products.write().await.push(record.clone());
        Ok(record)
    }

    async fn update_product(&self, id: &str, update: UpdateProduct) -> Result<ProductRecord, AppError> {
        update.validate()?;
        let mut products = self.products.write().await;
        let record = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound {
                resource: format!("product {}", id),
            })?;
        record.update(update);
        Ok(record.clone())
    }
}

/// Products and promotions stored as JSON arrays in two files.
///
/// Read failures are reported as transport errors, the same way a remote
/// store's would be.
pub struct JsonFileSource {
    products_path: PathBuf,
    promotions_path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileSource {
    pub fn new(products_path: impl Into<PathBuf>, promotions_path: impl Into<PathBuf>) -> Self {
        Self {
            products_path: products_path.into(),
            promotions_path: promotions_path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AppError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Transport(format!("reading {}: {}", path.display(), e)))?;
        let records: Vec<T> = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), records = records.len(), "loaded records");
        Ok(records)
    }

    async fn write_all<T: Serialize>(path: &Path, records: &[T]) -> Result<(), AppError> {
        let raw = serde_json::to_string_pretty(records)?;
        tokio::fs::write(path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl DataSource for JsonFileSource {
    async fn fetch_products(&self) -> Result<Vec<ProductRecord>, AppError> {
        Self::read_all(&self.products_path).await
    }

    async fn fetch_promotions(&self) -> Result<Vec<PromotionRecord>, AppError> {
        Self::read_all(&self.promotions_path).await
    }

    async fn add_product(&self, product: NewProduct) -> Result<ProductRecord, AppError> {
        product.validate()?;
        let _guard = self.write_lock.lock().await;
        let mut products: Vec<ProductRecord> = if tokio::fs::try_exists(&self.products_path).await? {
            Self::read_all(&self.products_path).await?
        } else {
            Vec::new()
        };
        let record = ProductRecord::new(product);
        products.push(record.clone());
        Self::write_all(&self.products_path, &products).await?;
        Ok(record)
    }

    async fn update_product(&self, id: &str, update: UpdateProduct) -> Result<ProductRecord, AppError> {
        update.validate()?;
        let _guard = self.write_lock.lock().await;
        let mut products: Vec<ProductRecord> = Self::read_all(&self.products_path).await?;
        let record = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound {
                resource: format!("product {}", id),
            })?;
        record.update(update);
        let updated = record.clone();
        Self::write_all(&self.products_path, &products).await?;
        Ok(updated)
    }
}
