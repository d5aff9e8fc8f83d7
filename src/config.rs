use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

use crate::classification::CategoryPolicy;
use crate::normalizer::{StoreAlias, StoreNormalizer, default_store_aliases};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub stores: StoresConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub products_ttl_secs: u64,
    pub promotions_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub keywords: Vec<String>,
    pub restrict_promotions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoresConfig {
    pub aliases: Vec<StoreAlias>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    pub min_confidence: f32,
    pub fallback_category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub products_path: String,
    pub promotions_path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            products_ttl_secs: 300,
            promotions_ttl_secs: 600,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            keywords: ["Rice", "Flour", "Sugar", "Milk", "Oil", "Bread", "Eggs", "Tea", "Lentils"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            restrict_promotions: true,
        }
    }
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            aliases: default_store_aliases(),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        let policy = CategoryPolicy::default();
        Self {
            min_confidence: policy.min_confidence,
            fallback_category: policy.fallback_category,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            products_path: "data/products.json".to_string(),
            promotions_path: "data/promotions.json".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            catalog: CatalogConfig::default(),
            stores: StoresConfig::default(),
            classification: ClassificationConfig::default(),
            data: DataConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "PRICEWISE_"
            .add_source(Environment::with_prefix("PRICEWISE").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.products_ttl_secs == 0 || self.cache.promotions_ttl_secs == 0 {
            return Err(ConfigError::Message("Cache TTLs must be greater than 0".into()));
        }

        if self.stores.aliases.iter().any(|a| a.canonical.trim().is_empty()) {
            return Err(ConfigError::Message("Store alias canonical name must not be empty".into()));
        }

        if self
            .stores
            .aliases
            .iter()
            .any(|a| a.patterns.is_empty() || a.patterns.iter().any(|p| p.trim().is_empty()))
        {
            return Err(ConfigError::Message("Store alias patterns must not be empty".into()));
        }

        if !(0.0..=1.0).contains(&self.classification.min_confidence) {
            return Err(ConfigError::Message(
                "Classification min_confidence must be between 0 and 1".into(),
            ));
        }

        if self.classification.fallback_category.trim().is_empty() {
            return Err(ConfigError::Message("Fallback category must not be empty".into()));
        }

        Ok(())
    }

    pub fn store_normalizer(&self) -> StoreNormalizer {
        // Patterns are matched against lower-cased names.
        let aliases = self
            .stores
            .aliases
            .iter()
            .map(|a| StoreAlias {
                canonical: a.canonical.clone(),
                patterns: a.patterns.iter().map(|p| p.trim().to_lowercase()).collect(),
            })
            .collect();
        StoreNormalizer::new(aliases)
    }

    pub fn category_policy(&self) -> CategoryPolicy {
        CategoryPolicy {
            min_confidence: self.classification.min_confidence,
            fallback_category: self.classification.fallback_category.clone(),
        }
    }

    pub fn products_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache.products_ttl_secs as i64)
    }

    pub fn promotions_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache.promotions_ttl_secs as i64)
    }
}
