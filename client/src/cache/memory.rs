//! In-memory key-value backend.

use super::KeyValueStore;
use crate::error::CacheError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Key-value store held in process memory. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValue {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryKeyValue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValue {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.get(key).map(|value| value.clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}
