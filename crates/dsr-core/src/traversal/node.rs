use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;

use super::{NodeStatus, QueryPlan};
use crate::graph::{CollectionAddress, GraphNode};

/// Nodo del grafo aumentado con el estado del recorrido.
#[derive(Debug, Clone)]
pub struct TraversalNode {
    pub node: Arc<GraphNode>,
    /// campo -> valores recibidos (semilla o productores).
    pub inputs: BTreeMap<String, Vec<Value>>,
    /// Productores que todavía no han completado.
    pub unresolved: BTreeSet<CollectionAddress>,
    pub status: NodeStatus,
}

impl TraversalNode {
    pub(crate) fn new(node: Arc<GraphNode>, unresolved: BTreeSet<CollectionAddress>) -> Self {
        Self { node,
               inputs: BTreeMap::new(),
               unresolved,
               status: NodeStatus::Pending }
    }

    pub fn address(&self) -> &CollectionAddress {
        &self.node.address
    }

    pub(crate) fn add_inputs(&mut self, field: &str, values: Vec<Value>) {
        let slot = self.inputs.entry(field.to_string()).or_default();
        for v in values {
            if !slot.contains(&v) {
                slot.push(v);
            }
        }
    }

    /// Plan de lectura derivado de las entradas actuales.
    pub fn plan(&self) -> QueryPlan {
        let mut fields: Vec<String> = self.node.collection.fields.iter().map(|f| f.name.clone()).collect();
        fields.sort();
        QueryPlan { address: self.node.address.clone(),
                    fields,
                    filters: self.inputs.iter().filter(|(_, v)| !v.is_empty()).map(|(k, v)| (k.clone(), v.clone())).collect() }
    }
}
