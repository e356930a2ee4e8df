use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::MergePolicy;
use crate::repositories::storage::validate_key;

/// Prefix for every environment variable the crate reads
pub const ENV_PREFIX: &str = "LAUNDRY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub storage: StorageConfig,
    pub cart: CartConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default = "default_cart_key")]
    pub cart_key: String,
    #[serde(default = "default_orders_key")]
    pub orders_key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartConfig {
    #[serde(default)]
    pub merge_policy: MergePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_enable_json_logging")]
    pub enable_json_logging: bool,
}

impl Config {
    /// Load configuration from `LAUNDRY_*` environment variables
    pub fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");
        Self::load(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load configuration from an explicit variable map instead of the process environment
    pub fn from_source(variables: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(config::Environment::with_prefix(ENV_PREFIX).source(Some(variables)))
    }

    fn load(environment: config::Environment) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(environment)
            .build()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to read configuration sources: {}", e),
            })?;

        let config = Config {
            storage: section(&settings, "storage")?,
            cart: section(&settings, "cart")?,
            observability: section(&settings, "observability")?,
        };

        config.validate()?;

        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.storage_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Storage directory cannot be empty".to_string(),
            });
        }

        if self.storage.cart_key.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Cart key cannot be empty".to_string(),
            });
        }

        if self.storage.orders_key.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Orders key cannot be empty".to_string(),
            });
        }

        for key in [&self.storage.cart_key, &self.storage.orders_key] {
            validate_key(key).map_err(|e| ConfigError::ValidationError {
                message: format!("Storage key '{}' cannot be used: {}", key, e),
            })?;
        }

        if self.storage.cart_key == self.storage.orders_key {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Cart and orders cannot share the storage key '{}'",
                    self.storage.cart_key
                ),
            });
        }

        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            cart_key: default_cart_key(),
            orders_key: default_orders_key(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            service_version: default_service_version(),
            log_level: default_log_level(),
            enable_json_logging: default_enable_json_logging(),
        }
    }
}

fn section<T: DeserializeOwned>(settings: &config::Config, name: &str) -> Result<T, ConfigError> {
    settings
        .clone()
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", name, e),
        })
}

// Default value functions
pub(crate) fn default_storage_dir() -> PathBuf {
    PathBuf::from(".laundry-cart")
}

pub(crate) fn default_cart_key() -> String {
    "cartItems".to_string()
}

pub(crate) fn default_orders_key() -> String {
    "orders".to_string()
}

pub(crate) fn default_service_name() -> String {
    "laundry-cart".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}

pub(crate) fn default_enable_json_logging() -> bool {
    false
}
