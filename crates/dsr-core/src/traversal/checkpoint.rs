//! Checkpoint serializable del recorrido para pausa/reanudación entre
//! procesos: nodos completados, en orden de completitud, con sus filas.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{IdentitySeed, NodeStatus, Row, Traversal};
use crate::errors::TraversalError;
use crate::graph::{CollectionAddress, DatasetGraph};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedNode {
    pub address: CollectionAddress,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalCheckpoint {
    pub graph_signature: String,
    pub completed: Vec<CompletedNode>,
}

impl TraversalCheckpoint {
    /// Captura los nodos completos de `traversal`; `rows_of` entrega las filas
    /// guardadas para cada uno.
    pub fn capture<F>(traversal: &Traversal, rows_of: F) -> Self
        where F: Fn(&CollectionAddress) -> Vec<Row>
    {
        let completed = traversal.completion_order()
                                 .iter()
                                 .map(|a| CompletedNode { address: a.clone(),
                                                          rows: rows_of(a) })
                                 .collect();
        Self { graph_signature: traversal.graph().signature().to_string(),
               completed }
    }
}

impl Traversal {
    /// Reconstruye un recorrido reproduciendo las completitudes del
    /// checkpoint. Los nodos no incluidos (pausados, fallidos u omitidos)
    /// vuelven a evaluarse desde cero.
    pub fn restore(graph: Arc<DatasetGraph>, seed: &IdentitySeed, checkpoint: &TraversalCheckpoint) -> Result<Self, TraversalError> {
        if graph.signature() != checkpoint.graph_signature {
            return Err(TraversalError::StaleCheckpoint);
        }
        let mut traversal = Traversal::new(graph, seed)?;
        for done in &checkpoint.completed {
            if traversal.status(&done.address) != Some(NodeStatus::Ready) {
                return Err(TraversalError::InvalidCheckpoint(done.address.clone()));
            }
            traversal.complete(&done.address, &done.rows);
        }
        Ok(traversal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Collection, Dataset, Field, FieldReference};
    use serde_json::json;

    fn graph() -> Arc<DatasetGraph> {
        let ds = vec![Dataset::new("a",
                                   "c",
                                   vec![Collection::new("users", vec![Field::new("user_id").identity("user_id")]),
                                        Collection::new("orders",
                                                        vec![Field::new("user_id").references(FieldReference::new("a", "users", "user_id"))])])];
        Arc::new(DatasetGraph::build(&ds).expect("graph"))
    }

    #[test]
    fn restore_keeps_outputs_and_reopens_rest() {
        let seed = IdentitySeed::from([("user_id".to_string(), json!("u1"))]);
        let mut t = Traversal::new(graph(), &seed).expect("traversal");
        let users = t.pop_ready().expect("users");
        let rows = vec![json!({"user_id": "u1"}).as_object().cloned().expect("row")];
        t.complete(users.address(), &rows);
        let orders = t.pop_ready().expect("orders");
        t.mark_paused(orders.address());

        let cp = TraversalCheckpoint::capture(&t, |_| rows.clone());
        let text = serde_json::to_string(&cp).expect("json");
        let cp: TraversalCheckpoint = serde_json::from_str(&text).expect("decode");

        let mut restored = Traversal::restore(graph(), &seed, &cp).expect("restore");
        assert_eq!(restored.status(users.address()), Some(NodeStatus::Complete));
        let again = restored.pop_ready().expect("orders ready again");
        assert_eq!(again.inputs.get("user_id"), Some(&vec![json!("u1")]));
    }

    #[test]
    fn restore_rejects_foreign_checkpoint() {
        let seed = IdentitySeed::from([("user_id".to_string(), json!("u1"))]);
        let cp = TraversalCheckpoint { graph_signature: "other".into(),
                                       completed: vec![] };
        assert_eq!(Traversal::restore(graph(), &seed, &cp).unwrap_err(), TraversalError::StaleCheckpoint);
    }
}
