use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::CollectionAddress;
use crate::policy::ActionType;
use crate::traversal::NodeStatus;

/// Transición de estado de un nodo emitida por el runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEvent {
    pub address: CollectionAddress,
    pub action_type: ActionType,
    pub status: NodeStatus,
    pub message: Option<String>,
}

impl NodeEvent {
    pub fn new(address: CollectionAddress, action_type: ActionType, status: NodeStatus) -> Self {
        Self { address,
               action_type,
               status,
               message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub seq: u64, // asignado por el store (orden de append)
    pub privacy_request_id: String,
    pub dataset_name: String,
    pub collection_name: String,
    pub action_type: ActionType,
    pub status: NodeStatus,
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionLogEntry {
    pub fn address(&self) -> CollectionAddress {
        CollectionAddress::new(self.dataset_name.clone(), self.collection_name.clone())
    }
}
