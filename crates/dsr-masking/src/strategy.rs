use std::fmt::Debug;

use serde_json::Value;

use crate::errors::MaskingError;
use crate::secrets::{MaskingSecretCache, SecretStore};

/// Contrato de una estrategia de enmascaramiento.
///
/// `mask` recibe el valor original de un campo y devuelve su reemplazo. Un
/// `Value::Null` de entrada siempre produce `Value::Null`.
pub trait MaskingStrategy: Send + Sync + Debug {
    /// Nombre estable con el que se registra la estrategia.
    fn name(&self) -> &'static str;

    fn mask(&self, value: &Value, privacy_request_id: &str, secrets: &dyn SecretStore) -> Result<Value, MaskingError>;

    fn secrets_required(&self) -> bool {
        false
    }

    /// Secretos a cachear al crear la solicitud. Vacío si no se requieren.
    fn generate_secrets_for_cache(&self) -> Vec<MaskingSecretCache> {
        Vec::new()
    }

    /// `None` se interpreta como `string`, el tipo por defecto de un campo.
    fn data_type_supported(&self, data_type: Option<&str>) -> bool;
}

/// Extrae el texto a enmascarar; sólo se aceptan strings.
pub(crate) fn string_input<'a>(strategy: &str, value: &'a Value) -> Result<&'a str, MaskingError> {
    match value {
        Value::String(s) => Ok(s.as_str()),
        other => Err(MaskingError::UnsupportedValue { strategy: strategy.to_string(),
                                                      value_type: value_type_name(other).to_string() }),
    }
}

pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn is_string_type(data_type: Option<&str>) -> bool {
    matches!(data_type, None | Some("string"))
}
