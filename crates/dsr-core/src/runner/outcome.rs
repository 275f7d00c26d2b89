use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::CollectionAddress;
use crate::request::PrivacyRequestStatus;
use crate::traversal::{NodeStatus, Row};

/// Resultado de una ejecución (o reanudación) de una solicitud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub privacy_request_id: String,
    pub status: PrivacyRequestStatus,
    /// regla de acceso -> nodo -> filas filtradas por categoría.
    pub access_results: BTreeMap<String, BTreeMap<CollectionAddress, Vec<Row>>>,
    pub erasure_counts: BTreeMap<CollectionAddress, usize>,
    pub node_statuses: BTreeMap<CollectionAddress, NodeStatus>,
    pub failed_nodes: Vec<CollectionAddress>,
    pub failure_reason: Option<String>,
}

impl ExecutionOutcome {
    pub(crate) fn new(privacy_request_id: &str, status: PrivacyRequestStatus) -> Self {
        Self { privacy_request_id: privacy_request_id.to_string(),
               status,
               access_results: BTreeMap::new(),
               erasure_counts: BTreeMap::new(),
               node_statuses: BTreeMap::new(),
               failed_nodes: vec![],
               failure_reason: None }
    }

    pub fn rows_for(&self, rule_key: &str, address: &CollectionAddress) -> Option<&Vec<Row>> {
        self.access_results.get(rule_key).and_then(|m| m.get(address))
    }
}
