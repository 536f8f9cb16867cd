use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::BoxError;

/// Constructor for cache clients, named by a manifest's cache provider.
pub trait CacheEngine: Send + Sync {
    /// Engine identifier, used in logs and summaries
    fn name(&self) -> &str;

    /// Build a client from the provider's `options` (JSON `null` when absent)
    fn create(&self, options: &Value) -> Result<Arc<dyn CacheClient>, BoxError>;
}

/// Cache client abstraction for storing temporary data
/// Used by plugins through the hub's named caches
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Get a value from the cache by key
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Set a value in the cache with a time-to-live
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), BoxError>;

    /// Delete a value from the cache
    async fn delete(&self, key: &str) -> Result<(), BoxError>;
}

const DEFAULT_MAX_BYTE_SIZE: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct MemoryOptions {
    #[serde(default = "default_max_byte_size", alias = "max_byte_size")]
    max_byte_size: usize,
    #[serde(default)]
    partition: Option<String>,
}

fn default_max_byte_size() -> usize {
    DEFAULT_MAX_BYTE_SIZE
}

/// In-process cache engine bounded by total stored bytes.
///
/// Options: `maxByteSize` (default 100 MiB) and `partition` (key namespace).
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryEngine;

impl CacheEngine for MemoryEngine {
    fn name(&self) -> &str {
        "memory"
    }

    fn create(&self, options: &Value) -> Result<Arc<dyn CacheClient>, BoxError> {
        let options: MemoryOptions = if options.is_null() {
            serde_json::from_value(Value::Object(Default::default()))?
        } else {
            serde_json::from_value(options.clone())?
        };
        Ok(Arc::new(MemoryCache::new(
            options.max_byte_size,
            options.partition,
        )))
    }
}

struct Slot {
    value: Vec<u8>,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

pub struct MemoryCache {
    max_byte_size: usize,
    partition: Option<String>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl MemoryCache {
    pub fn new(max_byte_size: usize, partition: Option<String>) -> Self {
        Self {
            max_byte_size,
            partition,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    fn key(&self, key: &str) -> String {
        match &self.partition {
            Some(partition) => format!("{}:{}", partition, key),
            None => key.to_string(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn stored_bytes(slots: &HashMap<String, Slot>) -> usize {
    slots.iter().map(|(k, s)| k.len() + s.value.len()).sum()
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let key = self.key(key);
        let mut slots = self.lock();
        match slots.get(&key) {
            Some(slot) if slot.is_live(Instant::now()) => Some(slot.value.clone()),
            Some(_) => {
                slots.remove(&key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), BoxError> {
        let key = self.key(key);
        let mut slots = self.lock();
        let now = Instant::now();
        slots.retain(|_, slot| slot.is_live(now));

        let replaced = slots.get(&key).map(|s| key.len() + s.value.len()).unwrap_or(0);
        let needed = stored_bytes(&slots) - replaced + key.len() + value.len();
        if needed > self.max_byte_size {
            return Err(format!(
                "cache size limit reached: {} bytes exceeds {}",
                needed, self.max_byte_size
            )
            .into());
        }

        slots.insert(
            key,
            Slot {
                value,
                expires_at: now.checked_add(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BoxError> {
        let key = self.key(key);
        self.lock().remove(&key);
        Ok(())
    }
}
