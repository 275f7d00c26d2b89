use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::Cache;
use crate::errors::CacheError;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |t| t > now)
    }
}

/// Cache en memoria con expiración perezosa (se purga al leer).
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for InMemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let value = self.entries.get(key).and_then(|e| e.is_live(now).then(|| e.value.clone()));
        if value.is_none() {
            self.entries.remove_if(key, |_, e| !e.is_live(now));
        }
        Ok(value)
    }

    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = ttl.map(|t| Instant::now() + t);
        self.entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let now = Instant::now();
        let mut keys: Vec<String> = self.entries
                                        .iter()
                                        .filter(|e| e.key().starts_with(prefix) && e.value().is_live(now))
                                        .map(|e| e.key().clone())
                                        .collect();
        keys.sort();
        Ok(keys)
    }
}
