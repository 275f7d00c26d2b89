//! Estrategia `random_string_rewrite`: reemplaza el valor por un string
//! alfanumérico aleatorio de longitud configurable.

use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::MaskingError;
use crate::format_preservation::FormatPreservation;
use crate::hash::parse_config;
use crate::secrets::SecretStore;
use crate::strategy::{is_string_type, MaskingStrategy};

pub const RANDOM_STRING_REWRITE: &str = "random_string_rewrite";

fn default_length() -> usize {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomStringMaskingConfiguration {
    #[serde(default = "default_length")]
    pub length: usize,
    #[serde(default)]
    pub format_preservation: Option<FormatPreservation>,
}

impl Default for RandomStringMaskingConfiguration {
    fn default() -> Self {
        Self { length: default_length(),
               format_preservation: None }
    }
}

#[derive(Debug, Clone)]
pub struct RandomStringRewriteStrategy {
    configuration: RandomStringMaskingConfiguration,
}

impl RandomStringRewriteStrategy {
    pub fn new(configuration: RandomStringMaskingConfiguration) -> Self {
        Self { configuration }
    }

    pub fn from_config(configuration: &Value) -> Result<Self, MaskingError> {
        Ok(Self::new(parse_config(RANDOM_STRING_REWRITE, configuration)?))
    }
}

impl MaskingStrategy for RandomStringRewriteStrategy {
    fn name(&self) -> &'static str {
        RANDOM_STRING_REWRITE
    }

    fn mask(&self, value: &Value, _privacy_request_id: &str, _secrets: &dyn SecretStore) -> Result<Value, MaskingError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let random: String = rand::rng().sample_iter(&Alphanumeric)
                                         .take(self.configuration.length)
                                         .map(char::from)
                                         .collect();
        Ok(Value::String(match &self.configuration.format_preservation {
                             Some(fp) => fp.format(&random),
                             None => random,
                         }))
    }

    fn data_type_supported(&self, data_type: Option<&str>) -> bool {
        is_string_type(data_type)
    }
}
