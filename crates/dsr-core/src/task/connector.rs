use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::ConnectorError;
use crate::graph::GraphNode;
use crate::repo::ConnectionConfig;
use crate::traversal::{QueryPlan, Row};

/// Acceso a un backend concreto. Una implementación por familia de backend;
/// cualquier serialización interna es responsabilidad del connector.
#[async_trait]
pub trait Connector: Send + Sync + Debug {
    async fn query(&self, node: &GraphNode, plan: &QueryPlan) -> Result<Vec<Row>, ConnectorError>;

    /// Actualiza las filas que coinciden con `filters` (claves primarias) con
    /// `values`. Devuelve el número de filas afectadas.
    async fn update(&self, node: &GraphNode, filters: &Row, values: &Row) -> Result<usize, ConnectorError>;

    async fn close(&self) {}
}

/// Crea el connector de cada `ConnectionConfig`.
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connector>, ConnectorError>;
}
