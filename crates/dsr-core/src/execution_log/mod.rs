//! Execution log: registro append-only del estado de cada nodo por
//! solicitud. Las entradas nunca se modifican ni se borran.

pub mod report;
pub mod store;
pub mod types;

pub use report::{replay_node_statuses, PrivacyRequestReport};
pub use store::{ExecutionLogStore, InMemoryExecutionLogStore};
pub use types::{ExecutionLogEntry, NodeEvent};
