//! Cache clave-valor con TTL: semilla de identidad, secretos de masking y
//! checkpoints de pausa.

pub mod keys;
pub mod memory;
pub mod secrets;

pub use keys::{checkpoint_key, identity_key, identity_prefix, masking_secret_key};
pub use memory::InMemoryCache;
pub use secrets::{cache_identity, cache_masking_secrets, get_cached_identity, CacheSecretStore};

use std::time::Duration;

use crate::errors::CacheError;

pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError>;
    fn delete(&self, key: &str) -> Result<(), CacheError>;
    /// Claves vivas que empiezan por `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError>;
}
