//! Estrategia `hash`: `digest(valor + salt)` codificado en hex.
//!
//! El salt se genera una vez por solicitud, de modo que el mismo valor
//! produce el mismo digest dentro de una solicitud y digests distintos entre
//! solicitudes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256, Sha512};

use crate::errors::MaskingError;
use crate::format_preservation::FormatPreservation;
use crate::secrets::{generate_secret_string, require_secret, MaskingSecretCache, SecretStore, SecretType};
use crate::strategy::{is_string_type, string_input, MaskingStrategy};

pub const HASH: &str = "hash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-512")]
    Sha512,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashMaskingConfiguration {
    #[serde(default)]
    pub algorithm: HashAlgorithm,
    #[serde(default)]
    pub format_preservation: Option<FormatPreservation>,
}

#[derive(Debug, Clone)]
pub struct HashMaskingStrategy {
    algorithm: HashAlgorithm,
    format_preservation: Option<FormatPreservation>,
}

impl HashMaskingStrategy {
    pub fn new(configuration: HashMaskingConfiguration) -> Self {
        Self { algorithm: configuration.algorithm,
               format_preservation: configuration.format_preservation }
    }

    pub fn from_config(configuration: &Value) -> Result<Self, MaskingError> {
        let cfg = parse_config::<HashMaskingConfiguration>(HASH, configuration)?;
        Ok(Self::new(cfg))
    }

    fn digest(&self, value: &str, salt: &str) -> String {
        match self.algorithm {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(value.as_bytes());
                hasher.update(salt.as_bytes());
                format!("{:x}", hasher.finalize())
            }
            HashAlgorithm::Sha512 => {
                let mut hasher = Sha512::new();
                hasher.update(value.as_bytes());
                hasher.update(salt.as_bytes());
                format!("{:x}", hasher.finalize())
            }
        }
    }
}

impl MaskingStrategy for HashMaskingStrategy {
    fn name(&self) -> &'static str {
        HASH
    }

    fn mask(&self, value: &Value, privacy_request_id: &str, secrets: &dyn SecretStore) -> Result<Value, MaskingError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let input = string_input(HASH, value)?;
        let salt = require_secret(secrets, privacy_request_id, HASH, SecretType::Salt)?;
        let masked = self.digest(input, &salt);
        Ok(Value::String(match &self.format_preservation {
                             Some(fp) => fp.format(&masked),
                             None => masked,
                         }))
    }

    fn secrets_required(&self) -> bool {
        true
    }

    fn generate_secrets_for_cache(&self) -> Vec<MaskingSecretCache> {
        vec![MaskingSecretCache { secret: generate_secret_string(),
                                  masking_strategy: HASH.to_string(),
                                  secret_type: SecretType::Salt }]
    }

    fn data_type_supported(&self, data_type: Option<&str>) -> bool {
        is_string_type(data_type)
    }
}

/// Deserializa la configuración de una estrategia; `null` equivale a `{}`.
pub(crate) fn parse_config<T>(strategy: &str, configuration: &Value) -> Result<T, MaskingError>
    where T: serde::de::DeserializeOwned
{
    let cfg = if configuration.is_null() {
        Value::Object(Default::default())
    } else {
        configuration.clone()
    };
    serde_json::from_value(cfg).map_err(|e| MaskingError::InvalidConfiguration { strategy: strategy.to_string(),
                                                                                 reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    struct Salts(HashMap<String, String>);

    impl SecretStore for Salts {
        fn get_secret(&self, request_id: &str, _strategy: &str, _t: SecretType) -> Result<Option<String>, MaskingError> {
            Ok(self.0.get(request_id).cloned())
        }
    }

    fn salts() -> Salts {
        Salts(HashMap::from([("req_a".to_string(), "salt-a".to_string()),
                             ("req_b".to_string(), "salt-b".to_string())]))
    }

    #[test]
    fn same_value_same_salt_same_digest() {
        let s = HashMaskingStrategy::from_config(&json!({})).expect("config");
        let store = salts();
        let a = s.mask(&json!("user@example.com"), "req_a", &store).expect("mask");
        let b = s.mask(&json!("user@example.com"), "req_a", &store).expect("mask");
        assert_eq!(a, b);
    }

    #[test]
    fn different_requests_produce_different_digests() {
        let s = HashMaskingStrategy::from_config(&json!({"algorithm": "SHA-256"})).expect("config");
        let store = salts();
        let a = s.mask(&json!("user@example.com"), "req_a", &store).expect("mask");
        let b = s.mask(&json!("user@example.com"), "req_b", &store).expect("mask");
        assert_ne!(a, b);
    }

    #[test]
    fn sha256_is_digest_of_value_plus_salt() {
        let s = HashMaskingStrategy::new(HashMaskingConfiguration::default());
        let got = s.mask(&json!("abc"), "req_a", &salts()).expect("mask");
        let mut h = Sha256::new();
        h.update(b"abcsalt-a");
        assert_eq!(got, json!(format!("{:x}", h.finalize())));
    }

    #[test]
    fn sha512_digest_length_and_suffix() {
        let s = HashMaskingStrategy::from_config(&json!({
                                                     "algorithm": "SHA-512",
                                                     "format_preservation": {"suffix": "@masked.com"}
                                                 })).expect("config");
        let got = s.mask(&json!("abc"), "req_a", &salts()).expect("mask");
        let text = got.as_str().expect("string");
        assert!(text.ends_with("@masked.com"));
        assert_eq!(text.len(), 128 + "@masked.com".len());
    }

    #[test]
    fn missing_salt_is_fatal() {
        let s = HashMaskingStrategy::new(HashMaskingConfiguration::default());
        let err = s.mask(&json!("abc"), "req_unknown", &salts()).unwrap_err();
        assert!(matches!(err, MaskingError::MissingSecret { secret_type: SecretType::Salt, .. }));
    }

    #[test]
    fn null_passes_through_and_numbers_are_rejected() {
        let s = HashMaskingStrategy::new(HashMaskingConfiguration::default());
        assert_eq!(s.mask(&Value::Null, "req_a", &salts()).expect("null"), Value::Null);
        assert!(matches!(s.mask(&json!(42), "req_a", &salts()), Err(MaskingError::UnsupportedValue { .. })));
        assert!(s.data_type_supported(Some("string")));
        assert!(!s.data_type_supported(Some("integer")));
    }

    #[test]
    fn generates_one_salt_for_cache() {
        let s = HashMaskingStrategy::new(HashMaskingConfiguration::default());
        assert!(s.secrets_required());
        let secrets = s.generate_secrets_for_cache();
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].secret_type, SecretType::Salt);
        assert_eq!(secrets[0].masking_strategy, HASH);
    }

    #[test]
    fn unknown_algorithm_is_invalid_configuration() {
        let err = HashMaskingStrategy::from_config(&json!({"algorithm": "MD5"})).unwrap_err();
        assert!(matches!(err, MaskingError::InvalidConfiguration { .. }));
    }
}
