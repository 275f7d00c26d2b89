//! Secretos de enmascaramiento por solicitud.
//!
//! Cada estrategia que los requiere genera sus secretos una sola vez al
//! crear la solicitud (`generate_secrets_for_cache`); el caller los guarda en
//! cache y la estrategia los lee en `mask` a través de un `SecretStore`.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::MaskingError;

/// Longitud en bytes de los secretos generados (se codifican en hex).
pub const SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    Salt,
    Key,
}

impl SecretType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretType::Salt => "salt",
            SecretType::Key => "key",
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secreto listo para ser cacheado bajo `(solicitud, estrategia, tipo)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingSecretCache {
    pub secret: String,
    pub masking_strategy: String,
    pub secret_type: SecretType,
}

/// Fuente de secretos consultada durante `mask`.
pub trait SecretStore: Send + Sync {
    fn get_secret(&self,
                  privacy_request_id: &str,
                  masking_strategy: &str,
                  secret_type: SecretType)
                  -> Result<Option<String>, MaskingError>;
}

/// Genera un secreto aleatorio codificado en hex.
pub fn generate_secret_string() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Lee un secreto obligatorio; su ausencia es `MissingSecret`.
pub(crate) fn require_secret(store: &dyn SecretStore,
                             privacy_request_id: &str,
                             masking_strategy: &str,
                             secret_type: SecretType)
                             -> Result<String, MaskingError> {
    store.get_secret(privacy_request_id, masking_strategy, secret_type)?
         .ok_or_else(|| MaskingError::MissingSecret { privacy_request_id: privacy_request_id.to_string(),
                                                      strategy: masking_strategy.to_string(),
                                                      secret_type })
}
