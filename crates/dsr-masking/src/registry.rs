//! Registro de estrategias indexado por nombre. Cada nombre se asocia a una
//! función fábrica que construye la estrategia a partir de su configuración
//! JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::errors::MaskingError;
use crate::hash::{HashMaskingStrategy, HASH};
use crate::null_rewrite::{NullRewriteStrategy, NULL_REWRITE};
use crate::random_string::{RandomStringRewriteStrategy, RANDOM_STRING_REWRITE};
use crate::strategy::MaskingStrategy;
use crate::string_rewrite::{StringRewriteStrategy, STRING_REWRITE};

pub type StrategyFactory = fn(&Value) -> Result<Arc<dyn MaskingStrategy>, MaskingError>;

#[derive(Debug, Clone)]
pub struct MaskingStrategyRegistry {
    factories: BTreeMap<String, StrategyFactory>,
}

impl MaskingStrategyRegistry {
    /// Registro vacío, sin estrategias.
    pub fn empty() -> Self {
        Self { factories: BTreeMap::new() }
    }

    /// Registra (o reemplaza) la fábrica asociada a `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: StrategyFactory) {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            debug!("masking strategy '{name}' replaced");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn get_strategy(&self, name: &str, configuration: &Value) -> Result<Arc<dyn MaskingStrategy>, MaskingError> {
        let Some(factory) = self.factories.get(name) else {
            warn!("unknown masking strategy '{name}'");
            return Err(MaskingError::UnknownStrategy(name.to_string()));
        };
        factory(configuration)
    }
}

impl Default for MaskingStrategyRegistry {
    fn default() -> Self {
        let mut r = Self::empty();
        r.register(HASH, |c| Ok(Arc::new(HashMaskingStrategy::from_config(c)?)));
        r.register(NULL_REWRITE, |c| Ok(Arc::new(NullRewriteStrategy::from_config(c)?)));
        r.register(RANDOM_STRING_REWRITE, |c| Ok(Arc::new(RandomStringRewriteStrategy::from_config(c)?)));
        r.register(STRING_REWRITE, |c| Ok(Arc::new(StringRewriteStrategy::from_config(c)?)));
        r
    }
}

static DEFAULT_REGISTRY: Lazy<MaskingStrategyRegistry> = Lazy::new(MaskingStrategyRegistry::default);

/// Atajo sobre el registro con las estrategias incluidas.
pub fn get_strategy(name: &str, configuration: &Value) -> Result<Arc<dyn MaskingStrategy>, MaskingError> {
    DEFAULT_REGISTRY.get_strategy(name, configuration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtins_are_registered() {
        let r = MaskingStrategyRegistry::default();
        assert_eq!(r.names(), vec![HASH, NULL_REWRITE, RANDOM_STRING_REWRITE, STRING_REWRITE]);
        assert_eq!(get_strategy(HASH, &json!({})).expect("hash").name(), HASH);
    }

    #[test]
    fn unknown_strategy_fails() {
        let err = get_strategy("aes_encrypt", &json!({})).unwrap_err();
        assert_eq!(err, MaskingError::UnknownStrategy("aes_encrypt".into()));
    }

    #[test]
    fn custom_factories_can_be_registered() {
        let mut r = MaskingStrategyRegistry::empty();
        assert!(!r.contains(NULL_REWRITE));
        r.register("redact", |c| Ok(Arc::new(NullRewriteStrategy::from_config(c)?)));
        assert_eq!(r.get_strategy("redact", &Value::Null).expect("redact").name(), NULL_REWRITE);
    }
}
