//! Errores del core, uno por preocupación.
//!
//! - `ValidationError`: construcción de grafo o política. Permanente.
//! - `TraversalError`: planificación. Permanente, nombra los nodos varados.
//! - `ConnectorError`: puede ser transitorio (reintento) o permanente.
//! - `RequestStateError`: transición inválida de una solicitud.

use dsr_masking::MaskingError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::CollectionAddress;
use crate::request::PrivacyRequestStatus;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("Referred to object {0} does not exist")]
    DanglingReference(String),
    #[error("Duplicate collection {0}")]
    DuplicateCollection(CollectionAddress),
    #[error("Invalid collection address '{0}'")]
    InvalidAddress(String),
    #[error("Policy rules are invalid, action conflict in erasure rules detected for categories {first} and {second}")]
    ActionConflict { first: String, second: String },
    #[error("Erasure rule '{0}' must specify a masking strategy")]
    MissingMaskingStrategy(String),
    #[error("Rule '{rule}' references unknown masking strategy '{strategy}'")]
    UnknownMaskingStrategy { rule: String, strategy: String },
    #[error("Rule '{rule}' has an invalid masking configuration: {reason}")]
    InvalidMaskingConfiguration { rule: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TraversalError {
    #[error("Some nodes were not reachable: {}", join_addresses(.nodes))]
    Unreachable { nodes: Vec<CollectionAddress> },
    #[error("checkpoint cannot be replayed: node {0} is unknown or not ready")]
    InvalidCheckpoint(CollectionAddress),
    #[error("checkpoint was taken against a different dataset graph")]
    StaleCheckpoint,
}

fn join_addresses(nodes: &[CollectionAddress]) -> String {
    nodes.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum ConnectorError {
    #[error("connector call timed out after {0} ms")]
    Timeout(u64),
    #[error("connection reset: {0}")]
    ConnectionReset(String),
    #[error("transient connector failure: {0}")]
    Transient(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("malformed query: {0}")]
    MalformedQuery(String),
    #[error("no connector configured for connection '{0}'")]
    NotConfigured(String),
    /// El backend exige confirmación externa antes de continuar.
    #[error("execution paused: {0}")]
    PauseRequested(String),
    #[error("connector failure: {0}")]
    Permanent(String),
}

impl ConnectorError {
    /// Errores que justifican un reintento con backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::ConnectionReset(_) | Self::Transient(_))
    }
}

/// Fallo terminal de la tarea de un nodo.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TaskError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error(transparent)]
    Masking(#[from] MaskingError),
}

impl TaskError {
    pub fn is_pause(&self) -> bool {
        matches!(self, Self::Connector(ConnectorError::PauseRequested(_)))
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RequestStateError {
    #[error("Invalid resume request: privacy request '{id}' status = {status}.")]
    InvalidResume { id: String, status: PrivacyRequestStatus },
    #[error("Cannot transition status")]
    CannotReview { id: String, status: PrivacyRequestStatus },
    #[error("privacy request '{id}' cannot transition from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: PrivacyRequestStatus,
        to: PrivacyRequestStatus,
    },
    #[error("privacy request '{id}' is not paused at webhook '{webhook}'")]
    WebhookMismatch { id: String, webhook: String },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("repository failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CacheError {
    #[error("cache connection failure: {0}")]
    Connection(String),
    #[error("cache value could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum WebhookError {
    #[error("webhook '{0}' timed out")]
    Timeout(String),
    #[error("webhook '{key}' failed: {reason}")]
    Transport { key: String, reason: String },
}

/// Errores que impiden ejecutar (o registrar) una solicitud. Los fallos de
/// planificación o de nodos no llegan aquí: se convierten en estado `error`
/// de la solicitud.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("No privacy request found with id '{0}'.")]
    RequestNotFound(String),
    #[error(transparent)]
    State(#[from] RequestStateError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Traversal(#[from] TraversalError),
    #[error(transparent)]
    Masking(#[from] MaskingError),
    #[error(transparent)]
    Webhook(#[from] WebhookError),
    #[error("internal: {0}")]
    Internal(String),
}
