//! dsr-core: grafo de datasets, recorrido y ejecución de solicitudes de
//! privacidad (access/erasure).
pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod execution_log;
pub mod graph;
pub mod hashing;
pub mod policy;
pub mod repo;
pub mod request;
pub mod runner;
pub mod task;
pub mod traversal;

pub use cache::{Cache, InMemoryCache};
pub use config::{ExecutionConfig, ExecutionMode, RetryPolicy};
pub use errors::{CacheError, ConnectorError, ExecutionError, RepositoryError, RequestStateError, TaskError, TraversalError,
                 ValidationError, WebhookError};
pub use execution_log::{ExecutionLogEntry, ExecutionLogStore, InMemoryExecutionLogStore, NodeEvent, PrivacyRequestReport};
pub use graph::{Collection, CollectionAddress, Dataset, DatasetGraph, Field, FieldAddress, FieldReference, ReferenceDirection};
pub use policy::{ActionType, MaskingStrategySpec, Policy, PolicyPreWebhook, Rule, RuleTarget};
pub use repo::{AccessLevel, ConnectionConfig, DatasetConfig, InMemoryRepository, Repository};
pub use request::{PrivacyRequest, PrivacyRequestStatus};
pub use runner::{CancelFlag, ExecutionOutcome, PrivacyRequestRunner, WebhookRequest, WebhookResponse, WebhookTransport};
pub use task::{Connector, ConnectorFactory};
pub use traversal::{dry_run, traverse, IdentitySeed, NodeStatus, QueryPlan, Row, Traversal, TraversalCheckpoint};
