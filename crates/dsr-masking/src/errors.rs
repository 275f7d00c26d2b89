//! Errores del subsistema de enmascaramiento.

use thiserror::Error;

use crate::secrets::SecretType;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MaskingError {
    #[error("unknown masking strategy '{0}'")]
    UnknownStrategy(String),
    #[error("invalid configuration for masking strategy '{strategy}': {reason}")]
    InvalidConfiguration { strategy: String, reason: String },
    /// La estrategia requiere secretos y no hay ninguno en cache para la
    /// solicitud. Es un error fatal: los secretos se generan al crear la
    /// solicitud, nunca durante el enmascaramiento.
    #[error("no {secret_type} secret cached for strategy '{strategy}' on privacy request '{privacy_request_id}'")]
    MissingSecret {
        privacy_request_id: String,
        strategy: String,
        secret_type: SecretType,
    },
    #[error("masking strategy '{strategy}' cannot mask value of type {value_type}")]
    UnsupportedValue { strategy: String, value_type: String },
    #[error("secret store failure: {0}")]
    SecretStore(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_secret_message_names_request_and_strategy() {
        let err = MaskingError::MissingSecret { privacy_request_id: "pri_1".into(),
                                                strategy: "hash".into(),
                                                secret_type: SecretType::Salt };
        assert_eq!(err.to_string(), "no salt secret cached for strategy 'hash' on privacy request 'pri_1'");
    }
}
