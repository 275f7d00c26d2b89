//! Puente entre la cache y los colaboradores que guardan identidad y
//! secretos de masking por solicitud.

use std::sync::Arc;
use std::time::Duration;

use dsr_masking::{MaskingError, MaskingStrategy, SecretStore, SecretType};
use log::debug;
use serde_json::Value;

use super::{identity_key, identity_prefix, masking_secret_key, Cache};
use crate::errors::CacheError;
use crate::traversal::IdentitySeed;

/// Guarda cada identity key no nula bajo `id-{request}-identity-{key}`.
pub fn cache_identity(cache: &dyn Cache, privacy_request_id: &str, identity: &IdentitySeed, ttl: Option<Duration>) -> Result<(), CacheError> {
    for (key, value) in identity {
        if value.is_null() {
            continue;
        }
        let encoded = serde_json::to_string(value).map_err(|e| CacheError::Decode(e.to_string()))?;
        cache.set(&identity_key(privacy_request_id, key), encoded, ttl)?;
    }
    Ok(())
}

/// Reconstruye la semilla de identidad guardada para la solicitud.
pub fn get_cached_identity(cache: &dyn Cache, privacy_request_id: &str) -> Result<IdentitySeed, CacheError> {
    let prefix = identity_prefix(privacy_request_id);
    let mut seed = IdentitySeed::new();
    for key in cache.keys_with_prefix(&prefix)? {
        let Some(raw) = cache.get(&key)? else { continue };
        let value: Value = serde_json::from_str(&raw).map_err(|e| CacheError::Decode(e.to_string()))?;
        seed.insert(key[prefix.len()..].to_string(), value);
    }
    Ok(seed)
}

/// Genera y guarda los secretos de cada estrategia que los requiere. Una
/// estrategia cuyo secreto ya existe no se regenera.
pub fn cache_masking_secrets(cache: &dyn Cache,
                             privacy_request_id: &str,
                             strategies: &[Arc<dyn MaskingStrategy>],
                             ttl: Option<Duration>)
                             -> Result<usize, CacheError> {
    let mut written = 0;
    for strategy in strategies.iter().filter(|s| s.secrets_required()) {
        for secret in strategy.generate_secrets_for_cache() {
            let key = masking_secret_key(privacy_request_id, &secret.masking_strategy, secret.secret_type);
            if cache.get(&key)?.is_some() {
                continue;
            }
            cache.set(&key, secret.secret, ttl)?;
            written += 1;
        }
    }
    debug!("cached {written} masking secrets for {privacy_request_id}");
    Ok(written)
}

/// `SecretStore` respaldado por la cache.
pub struct CacheSecretStore {
    cache: Arc<dyn Cache>,
}

impl CacheSecretStore {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

impl SecretStore for CacheSecretStore {
    fn get_secret(&self, privacy_request_id: &str, masking_strategy: &str, secret_type: SecretType) -> Result<Option<String>, MaskingError> {
        self.cache
            .get(&masking_secret_key(privacy_request_id, masking_strategy, secret_type))
            .map_err(|e| MaskingError::SecretStore(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use dsr_masking::{get_strategy, HASH};
    use serde_json::json;

    #[test]
    fn identity_roundtrips_through_cache() {
        let cache = InMemoryCache::new();
        let seed = IdentitySeed::from([("email".to_string(), json!("a@b.c")), ("phone".to_string(), Value::Null)]);
        cache_identity(&cache, "pri_1", &seed, None).expect("cache");
        let back = get_cached_identity(&cache, "pri_1").expect("read");
        assert_eq!(back, IdentitySeed::from([("email".to_string(), json!("a@b.c"))]));
        assert!(get_cached_identity(&cache, "pri_2").expect("read").is_empty());
    }

    #[test]
    fn secrets_are_generated_once_per_request() {
        let cache = Arc::new(InMemoryCache::new());
        let hash = get_strategy(HASH, &json!({})).expect("hash");
        let strategies = vec![hash.clone(), hash];
        assert_eq!(cache_masking_secrets(cache.as_ref(), "pri_1", &strategies, None).expect("cache"), 1);
        let store = CacheSecretStore::new(cache.clone());
        let salt = store.get_secret("pri_1", HASH, SecretType::Salt).expect("get").expect("salt");
        assert_eq!(cache_masking_secrets(cache.as_ref(), "pri_1", &strategies, None).expect("cache"), 0);
        assert_eq!(store.get_secret("pri_1", HASH, SecretType::Salt).expect("get"), Some(salt));
        assert_eq!(store.get_secret("pri_2", HASH, SecretType::Salt).expect("get"), None);
    }
}
