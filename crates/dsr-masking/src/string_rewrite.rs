//! Estrategia `string_rewrite`: reemplaza el valor por un string fijo.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::MaskingError;
use crate::format_preservation::FormatPreservation;
use crate::hash::parse_config;
use crate::secrets::SecretStore;
use crate::strategy::{is_string_type, MaskingStrategy};

pub const STRING_REWRITE: &str = "string_rewrite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringRewriteMaskingConfiguration {
    pub rewrite_value: String,
    #[serde(default)]
    pub format_preservation: Option<FormatPreservation>,
}

#[derive(Debug, Clone)]
pub struct StringRewriteStrategy {
    configuration: StringRewriteMaskingConfiguration,
}

impl StringRewriteStrategy {
    pub fn new(configuration: StringRewriteMaskingConfiguration) -> Self {
        Self { configuration }
    }

    pub fn from_config(configuration: &Value) -> Result<Self, MaskingError> {
        Ok(Self::new(parse_config(STRING_REWRITE, configuration)?))
    }
}

impl MaskingStrategy for StringRewriteStrategy {
    fn name(&self) -> &'static str {
        STRING_REWRITE
    }

    fn mask(&self, value: &Value, _privacy_request_id: &str, _secrets: &dyn SecretStore) -> Result<Value, MaskingError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let rewrite = &self.configuration.rewrite_value;
        Ok(Value::String(match &self.configuration.format_preservation {
                             Some(fp) => fp.format(rewrite),
                             None => rewrite.clone(),
                         }))
    }

    fn data_type_supported(&self, data_type: Option<&str>) -> bool {
        is_string_type(data_type)
    }
}
