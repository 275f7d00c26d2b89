//! Construcción y validación del `DatasetGraph`.
//!
//! Invariantes tras `build`:
//! - no hay dos colecciones con la misma `CollectionAddress`;
//! - ambos extremos de cada arista son campos declarados en el grafo.
//!
//! El grafo es inmutable una vez construido; se comparte vía `Arc`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Collection, CollectionAddress, Dataset, FieldAddress, ReferenceDirection};
use crate::errors::ValidationError;
use crate::hashing::hash_value;

/// Nodo del grafo: una colección y la conexión que la sirve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub address: CollectionAddress,
    pub connection_key: String,
    pub collection: Collection,
}

/// Arista dirigida: los valores de `from` alimentan el filtro de `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub from: FieldAddress,
    pub to: FieldAddress,
}

#[derive(Debug)]
pub struct DatasetGraph {
    nodes: BTreeMap<CollectionAddress, Arc<GraphNode>>,
    edges: BTreeSet<Edge>,
    inbound: BTreeMap<CollectionAddress, Vec<Edge>>,
    outbound: BTreeMap<CollectionAddress, Vec<Edge>>,
    identity_keys: BTreeMap<FieldAddress, String>,
    signature: String,
}

impl DatasetGraph {
    pub fn build(datasets: &[Dataset]) -> Result<Self, ValidationError> {
        let mut nodes: BTreeMap<CollectionAddress, Arc<GraphNode>> = BTreeMap::new();
        for ds in datasets {
            for collection in &ds.collections {
                let address = CollectionAddress::new(ds.name.clone(), collection.name.clone());
                if nodes.contains_key(&address) {
                    return Err(ValidationError::DuplicateCollection(address));
                }
                nodes.insert(address.clone(),
                             Arc::new(GraphNode { address,
                                                  connection_key: ds.connection_key.clone(),
                                                  collection: collection.clone() }));
            }
        }

        let mut edges = BTreeSet::new();
        let mut identity_keys = BTreeMap::new();
        for node in nodes.values() {
            for field in &node.collection.fields {
                let here = node.address.field_address(field.name.clone());
                if let Some(key) = &field.identity {
                    identity_keys.insert(here.clone(), key.clone());
                }
                for reference in &field.references {
                    let there = FieldAddress::new(reference.dataset.clone(),
                                                  reference.collection.clone(),
                                                  reference.field.clone());
                    let declared = nodes.get(&there.collection_address())
                                        .map(|n| n.collection.field(&there.field).is_some())
                                        .unwrap_or(false);
                    if !declared {
                        return Err(ValidationError::DanglingReference(there.to_string()));
                    }
                    let edge = match reference.direction.unwrap_or(ReferenceDirection::From) {
                        ReferenceDirection::From => Edge { from: there, to: here.clone() },
                        ReferenceDirection::To => Edge { from: here.clone(), to: there },
                    };
                    edges.insert(edge);
                }
            }
        }

        let mut inbound: BTreeMap<CollectionAddress, Vec<Edge>> = BTreeMap::new();
        let mut outbound: BTreeMap<CollectionAddress, Vec<Edge>> = BTreeMap::new();
        for e in &edges {
            inbound.entry(e.to.collection_address()).or_default().push(e.clone());
            outbound.entry(e.from.collection_address()).or_default().push(e.clone());
        }

        let signature = hash_value(&serde_json::to_value(datasets).unwrap_or_default());

        Ok(Self { nodes,
                  edges,
                  inbound,
                  outbound,
                  identity_keys,
                  signature })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, address: &CollectionAddress) -> Option<&Arc<GraphNode>> {
        self.nodes.get(address)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Arc<GraphNode>> {
        self.nodes.values()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &CollectionAddress> {
        self.nodes.keys()
    }

    pub fn edges(&self) -> &BTreeSet<Edge> {
        &self.edges
    }

    pub fn inbound_edges(&self, address: &CollectionAddress) -> &[Edge] {
        self.inbound.get(address).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn outbound_edges(&self, address: &CollectionAddress) -> &[Edge] {
        self.outbound.get(address).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Campo sembrable → identity key que lo alimenta.
    pub fn identity_keys(&self) -> &BTreeMap<FieldAddress, String> {
        &self.identity_keys
    }

    /// Firma estable del conjunto de datasets de entrada.
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Field, FieldReference};

    fn users_orders() -> Vec<Dataset> {
        vec![Dataset::new("a",
                          "conn_a",
                          vec![Collection::new("users",
                                               vec![Field::new("user_id").identity("user_id").primary_key(),
                                                    Field::new("email").category("user.contact.email")])]),
             Dataset::new("b",
                          "conn_b",
                          vec![Collection::new("orders",
                                               vec![Field::new("id").primary_key(),
                                                    Field::new("user_id").references(FieldReference::new("a", "users", "user_id"))])])]
    }

    #[test]
    fn builds_nodes_edges_and_identity_keys() {
        let g = DatasetGraph::build(&users_orders()).expect("graph");
        assert_eq!(g.len(), 2);
        let edge = g.edges().iter().next().expect("edge");
        assert_eq!(edge.from.to_string(), "a:users:user_id");
        assert_eq!(edge.to.to_string(), "b:orders:user_id");
        assert_eq!(g.inbound_edges(&CollectionAddress::new("b", "orders")).len(), 1);
        assert!(g.inbound_edges(&CollectionAddress::new("a", "users")).is_empty());
        assert_eq!(g.identity_keys().get(&FieldAddress::new("a", "users", "user_id")).map(String::as_str),
                   Some("user_id"));
    }

    #[test]
    fn direction_to_reverses_edge() {
        let mut ds = users_orders();
        ds[1].collections[0].fields[1].references[0].direction = Some(ReferenceDirection::To);
        let g = DatasetGraph::build(&ds).expect("graph");
        let edge = g.edges().iter().next().expect("edge");
        assert_eq!(edge.from.to_string(), "b:orders:user_id");
    }

    #[test]
    fn reference_to_undeclared_dataset_fails() {
        let ds = users_orders();
        let err = DatasetGraph::build(&ds[1..]).unwrap_err();
        assert_eq!(err, ValidationError::DanglingReference("a:users:user_id".into()));
        assert_eq!(err.to_string(), "Referred to object a:users:user_id does not exist");
    }

    #[test]
    fn reference_to_undeclared_field_fails() {
        let mut ds = users_orders();
        ds[1].collections[0].fields[1].references[0].field = "missing".into();
        assert!(matches!(DatasetGraph::build(&ds), Err(ValidationError::DanglingReference(_))));
    }

    #[test]
    fn duplicate_collection_fails() {
        let mut ds = users_orders();
        ds.push(Dataset::new("a", "conn_a", vec![Collection::new("users", vec![Field::new("x")])]));
        assert_eq!(DatasetGraph::build(&ds).unwrap_err(),
                   ValidationError::DuplicateCollection(CollectionAddress::new("a", "users")));
    }

    #[test]
    fn signature_is_stable() {
        let a = DatasetGraph::build(&users_orders()).expect("graph");
        let b = DatasetGraph::build(&users_orders()).expect("graph");
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.signature().len(), 64);
    }
}
