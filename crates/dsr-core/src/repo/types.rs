use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::Dataset;

/// Dataset registrado bajo una clave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub key: String,
    pub dataset: Dataset,
}

impl DatasetConfig {
    pub fn new(key: impl Into<String>, dataset: Dataset) -> Self {
        Self { key: key.into(), dataset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Read,
    #[default]
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub key: String,
    pub name: String,
    /// Familia de backend (`postgres`, `mongodb`, ...). El factory decide.
    pub connection_type: String,
    #[serde(default)]
    pub access: AccessLevel,
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
}

impl ConnectionConfig {
    pub fn new(key: impl Into<String>, connection_type: impl Into<String>) -> Self {
        let key = key.into();
        Self { name: key.clone(),
               key,
               connection_type: connection_type.into(),
               access: AccessLevel::Write,
               secrets: BTreeMap::new() }
    }

    pub fn read_only(mut self) -> Self {
        self.access = AccessLevel::Read;
        self
    }
}
