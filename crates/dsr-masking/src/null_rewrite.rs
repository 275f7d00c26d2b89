//! Estrategia `null_rewrite`: reemplaza cualquier valor por `null`.

use serde_json::Value;

use crate::errors::MaskingError;
use crate::secrets::SecretStore;
use crate::strategy::MaskingStrategy;

pub const NULL_REWRITE: &str = "null_rewrite";

#[derive(Debug, Clone, Default)]
pub struct NullRewriteStrategy;

impl NullRewriteStrategy {
    pub fn from_config(_configuration: &Value) -> Result<Self, MaskingError> {
        Ok(Self)
    }
}

impl MaskingStrategy for NullRewriteStrategy {
    fn name(&self) -> &'static str {
        NULL_REWRITE
    }

    fn mask(&self, _value: &Value, _privacy_request_id: &str, _secrets: &dyn SecretStore) -> Result<Value, MaskingError> {
        Ok(Value::Null)
    }

    fn data_type_supported(&self, _data_type: Option<&str>) -> bool {
        true
    }
}
