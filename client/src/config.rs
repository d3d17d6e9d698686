//! Configuration management for the client.

use pantry_engine::DepletionThreshold;
use std::env;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Remote collection holding inventory items
    pub items_collection: String,
    /// Remote collection holding the restock list
    pub restock_collection: String,
    /// Cache key for the item snapshot
    pub items_cache_key: String,
    /// Cache key for the restock list
    pub restock_cache_key: String,
    /// Quantity at or below which an item goes on the restock list
    pub depletion_threshold: DepletionThreshold,
    /// SQLite URL for the local cache
    pub cache_database_url: String,
    /// Connectivity assumed at startup until the host reports otherwise
    pub start_online: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            items_collection: "items".to_string(),
            restock_collection: "shopping-list".to_string(),
            items_cache_key: "cachedItems".to_string(),
            restock_cache_key: "cachedShoppingList".to_string(),
            depletion_threshold: DepletionThreshold::default(),
            cache_database_url: "sqlite://pantry-cache.db?mode=rwc".to_string(),
            start_online: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let depletion_threshold = match lookup("DEPLETION_THRESHOLD") {
            Some(raw) => DepletionThreshold::new(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidThreshold(raw))?,
            ),
            None => defaults.depletion_threshold,
        };

        let start_online = match lookup("START_ONLINE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidBool {
                name: "START_ONLINE",
                value: raw,
            })?,
            None => defaults.start_online,
        };

        Ok(Self {
            items_collection: lookup("ITEMS_COLLECTION").unwrap_or(defaults.items_collection),
            restock_collection: lookup("RESTOCK_COLLECTION")
                .unwrap_or(defaults.restock_collection),
            items_cache_key: lookup("ITEMS_CACHE_KEY").unwrap_or(defaults.items_cache_key),
            restock_cache_key: lookup("RESTOCK_CACHE_KEY").unwrap_or(defaults.restock_cache_key),
            depletion_threshold,
            cache_database_url: lookup("CACHE_DATABASE_URL")
                .unwrap_or(defaults.cache_database_url),
            start_online,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid DEPLETION_THRESHOLD value: {0}")]
    InvalidThreshold(String),

    #[error("Invalid {name} value: {value}")]
    InvalidBool { name: &'static str, value: String },
}
