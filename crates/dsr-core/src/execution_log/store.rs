use std::collections::HashMap;

use chrono::Utc;

use super::{ExecutionLogEntry, NodeEvent};

/// Almacenamiento append-only de entradas del execution log.
pub trait ExecutionLogStore: Send {
    /// Agrega una entrada a partir del evento y la devuelve completa (con
    /// `seq` y `updated_at`).
    fn append(&mut self, privacy_request_id: &str, event: NodeEvent) -> ExecutionLogEntry;
    /// Entradas de una solicitud en orden ascendente de `seq`.
    fn list(&self, privacy_request_id: &str) -> Vec<ExecutionLogEntry>;
}

#[derive(Debug, Default)]
pub struct InMemoryExecutionLogStore {
    inner: HashMap<String, Vec<ExecutionLogEntry>>,
}

impl ExecutionLogStore for InMemoryExecutionLogStore {
    fn append(&mut self, privacy_request_id: &str, event: NodeEvent) -> ExecutionLogEntry {
        let entries = self.inner.entry(privacy_request_id.to_string()).or_default();
        let entry = ExecutionLogEntry { seq: entries.len() as u64,
                                        privacy_request_id: privacy_request_id.to_string(),
                                        dataset_name: event.address.dataset,
                                        collection_name: event.address.collection,
                                        action_type: event.action_type,
                                        status: event.status,
                                        message: event.message,
                                        updated_at: Utc::now() };
        entries.push(entry.clone());
        entry
    }

    fn list(&self, privacy_request_id: &str) -> Vec<ExecutionLogEntry> {
        self.inner.get(privacy_request_id).cloned().unwrap_or_default()
    }
}
