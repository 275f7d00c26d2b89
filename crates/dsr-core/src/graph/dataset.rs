//! Definición declarativa de datasets, colecciones y campos.

use serde::{Deserialize, Serialize};

/// Sentido del flujo de valores de una referencia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceDirection {
    /// El campo referenciado alimenta a este campo.
    From,
    /// Este campo alimenta al campo referenciado.
    To,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReference {
    pub dataset: String,
    pub collection: String,
    pub field: String,
    #[serde(default)]
    pub direction: Option<ReferenceDirection>,
}

impl FieldReference {
    pub fn new(dataset: impl Into<String>, collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self { dataset: dataset.into(),
               collection: collection.into(),
               field: field.into(),
               direction: None }
    }

    pub fn direction(mut self, direction: ReferenceDirection) -> Self {
        self.direction = Some(direction);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub data_categories: Vec<String>,
    /// Identity key (p.ej. `email`) con la que la solicitud siembra este campo.
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub references: Vec<FieldReference>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub data_type: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               data_categories: Vec::new(),
               identity: None,
               references: Vec::new(),
               primary_key: false,
               data_type: None }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.data_categories.push(category.into());
        self
    }

    pub fn identity(mut self, key: impl Into<String>) -> Self {
        self.identity = Some(key.into());
        self
    }

    pub fn references(mut self, reference: FieldReference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Collection {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self { name: name.into(),
               fields }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.primary_key)
    }

    pub fn identity_fields(&self) -> impl Iterator<Item = (&Field, &str)> {
        self.fields.iter().filter_map(|f| f.identity.as_deref().map(|k| (f, k)))
    }
}

/// Dataset ligado a una conexión (`connection_key`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub connection_key: String,
    pub collections: Vec<Collection>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, connection_key: impl Into<String>, collections: Vec<Collection>) -> Self {
        Self { name: name.into(),
               connection_key: connection_key.into(),
               collections }
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }
}
