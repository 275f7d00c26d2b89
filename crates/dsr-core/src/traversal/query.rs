//! Plan de consulta neutral respecto al backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::DRY_RUN_PLACEHOLDER;
use crate::graph::CollectionAddress;

/// Fila devuelta por un connector.
pub type Row = serde_json::Map<String, Value>;

/// Lectura de una colección: campos a devolver y filtros `campo IN (...)`
/// combinados con OR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub address: CollectionAddress,
    pub fields: Vec<String>,
    pub filters: BTreeMap<String, Vec<Value>>,
}

impl QueryPlan {
    /// Sin filtros no hay nada que consultar.
    pub fn is_empty(&self) -> bool {
        self.filters.values().all(Vec::is_empty)
    }

    /// Una fila coincide si algún filtro contiene el valor de su campo.
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().any(|(field, values)| match row.get(field) {
                                   Some(Value::Array(items)) => items.iter().any(|i| values.contains(i)),
                                   Some(v) => values.contains(v),
                                   None => false,
                               })
    }

    /// Texto de la consulta con marcadores en lugar de valores.
    pub fn render(&self) -> String {
        let mut text = format!("SELECT {} FROM {}", self.fields.join(","), self.address.collection);
        let clauses: Vec<String> = self.filters
                                       .iter()
                                       .filter(|(_, values)| !values.is_empty())
                                       .map(|(field, values)| {
                                           if values.len() == 1 {
                                               format!("{} = {}", field, DRY_RUN_PLACEHOLDER)
                                           } else {
                                               let marks = vec![DRY_RUN_PLACEHOLDER; values.len()].join(", ");
                                               format!("{} IN ({})", field, marks)
                                           }
                                       })
                                       .collect();
        if !clauses.is_empty() {
            text.push_str(" WHERE ");
            text.push_str(&clauses.join(" OR "));
        }
        text
    }
}

/// Valores no nulos de `field` en `rows`, aplanando arrays y sin duplicados.
pub(crate) fn collect_values(rows: &[Row], field: &str) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    let mut push = |v: &Value| {
        if !v.is_null() && !out.contains(v) {
            out.push(v.clone());
        }
    };
    for row in rows {
        match row.get(field) {
            Some(Value::Array(items)) => items.iter().for_each(&mut push),
            Some(v) => push(v),
            None => {}
        }
    }
    out
}
