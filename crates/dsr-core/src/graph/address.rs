use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Identidad de un nodo del grafo: `(dataset, collection)`.
///
/// Se serializa como `"dataset:collection"`, lo que permite usarla como clave
/// de mapas JSON (checkpoints).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionAddress {
    pub dataset: String,
    pub collection: String,
}

impl CollectionAddress {
    pub fn new(dataset: impl Into<String>, collection: impl Into<String>) -> Self {
        Self { dataset: dataset.into(),
               collection: collection.into() }
    }

    pub fn field_address(&self, field: impl Into<String>) -> FieldAddress {
        FieldAddress { dataset: self.dataset.clone(),
                       collection: self.collection.clone(),
                       field: field.into() }
    }
}

impl fmt::Display for CollectionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dataset, self.collection)
    }
}

impl FromStr for CollectionAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((d, c)) if !d.is_empty() && !c.is_empty() && !c.contains(':') => Ok(Self::new(d, c)),
            _ => Err(ValidationError::InvalidAddress(s.to_string())),
        }
    }
}

impl TryFrom<String> for CollectionAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CollectionAddress> for String {
    fn from(value: CollectionAddress) -> Self {
        value.to_string()
    }
}

/// Un campo concreto dentro de una colección.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldAddress {
    pub dataset: String,
    pub collection: String,
    pub field: String,
}

impl FieldAddress {
    pub fn new(dataset: impl Into<String>, collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self { dataset: dataset.into(),
               collection: collection.into(),
               field: field.into() }
    }

    pub fn collection_address(&self) -> CollectionAddress {
        CollectionAddress::new(self.dataset.clone(), self.collection.clone())
    }
}

impl fmt::Display for FieldAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.dataset, self.collection, self.field)
    }
}
