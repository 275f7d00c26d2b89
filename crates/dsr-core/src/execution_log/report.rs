//! Lectura del execution log: replay de estados por nodo y reporte de una
//! solicitud. El detalle embebido depende de un flag explícito.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ExecutionLogEntry;
use crate::constants::EMBEDDED_EXECUTION_LOG_LIMIT;
use crate::graph::CollectionAddress;
use crate::policy::ActionType;
use crate::request::PrivacyRequest;
use crate::traversal::NodeStatus;

/// Último estado de cada nodo para `action`, reproduciendo las entradas en
/// orden.
pub fn replay_node_statuses(entries: &[ExecutionLogEntry], action: ActionType) -> BTreeMap<CollectionAddress, NodeStatus> {
    let mut sorted: Vec<&ExecutionLogEntry> = entries.iter().filter(|e| e.action_type == action).collect();
    sorted.sort_by_key(|e| e.seq);
    sorted.into_iter().map(|e| (e.address(), e.status)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyRequestReport {
    #[serde(flatten)]
    pub request: PrivacyRequest,
    /// dataset -> entradas (como mucho `EMBEDDED_EXECUTION_LOG_LIMIT`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<BTreeMap<String, Vec<ExecutionLogEntry>>>,
}

impl PrivacyRequestReport {
    pub fn build(request: PrivacyRequest, entries: &[ExecutionLogEntry], verbose: bool) -> Self {
        let results = verbose.then(|| {
                                 let mut sorted: Vec<&ExecutionLogEntry> = entries.iter().collect();
                                 sorted.sort_by_key(|e| e.seq);
                                 let mut grouped: BTreeMap<String, Vec<ExecutionLogEntry>> = BTreeMap::new();
                                 for e in sorted {
                                     let slot = grouped.entry(e.dataset_name.clone()).or_default();
                                     if slot.len() < EMBEDDED_EXECUTION_LOG_LIMIT {
                                         slot.push(e.clone());
                                     }
                                 }
                                 grouped
                             });
        Self { request, results }
    }
}
