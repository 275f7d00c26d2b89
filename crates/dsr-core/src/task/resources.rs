//! Recursos de una solicitud: connectors, política activa y cache de filas
//! por nodo. Nunca se comparten entre solicitudes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dashmap::DashMap;
use dsr_masking::SecretStore;
use log::{debug, warn};

use super::{Connector, ConnectorFactory};
use crate::errors::{ConnectorError, RepositoryError};
use crate::graph::{CollectionAddress, DatasetGraph};
use crate::policy::Policy;
use crate::repo::{ConnectionConfig, Repository};
use crate::traversal::Row;

pub struct TaskResources {
    pub privacy_request_id: String,
    pub policy: Arc<Policy>,
    connectors: BTreeMap<String, Arc<dyn Connector>>,
    configs: BTreeMap<String, ConnectionConfig>,
    failures: BTreeMap<String, ConnectorError>,
    rows: DashMap<CollectionAddress, Arc<Vec<Row>>>,
    secrets: Arc<dyn SecretStore>,
}

impl TaskResources {
    /// Abre un connector por cada conexión referenciada por el grafo. Las
    /// conexiones sin configuración o que fallan al abrir se recuerdan y
    /// hacen fallar a sus nodos.
    pub async fn acquire<R>(privacy_request_id: &str,
                            policy: Arc<Policy>,
                            graph: &DatasetGraph,
                            repo: &R,
                            factory: &dyn ConnectorFactory,
                            secrets: Arc<dyn SecretStore>)
                            -> Result<Self, RepositoryError>
        where R: Repository + ?Sized
    {
        let keys: BTreeSet<&str> = graph.nodes().map(|n| n.connection_key.as_str()).collect();
        let mut connectors = BTreeMap::new();
        let mut configs = BTreeMap::new();
        let mut failures = BTreeMap::new();
        for key in keys {
            let Some(config) = repo.get_connection_config(key)? else {
                warn!("no connection config '{key}' for {privacy_request_id}");
                failures.insert(key.to_string(), ConnectorError::NotConfigured(key.to_string()));
                continue;
            };
            match factory.connect(&config).await {
                Ok(c) => {
                    connectors.insert(key.to_string(), c);
                }
                Err(e) => {
                    warn!("connection '{key}' could not be opened: {e}");
                    failures.insert(key.to_string(), e);
                }
            }
            configs.insert(key.to_string(), config);
        }
        debug!("acquired {} connectors for {privacy_request_id}", connectors.len());
        Ok(Self { privacy_request_id: privacy_request_id.to_string(),
                  policy,
                  connectors,
                  configs,
                  failures,
                  rows: DashMap::new(),
                  secrets })
    }

    pub fn connector(&self, connection_key: &str) -> Result<Arc<dyn Connector>, ConnectorError> {
        if let Some(c) = self.connectors.get(connection_key) {
            return Ok(c.clone());
        }
        Err(self.failures
                .get(connection_key)
                .cloned()
                .unwrap_or_else(|| ConnectorError::NotConfigured(connection_key.to_string())))
    }

    pub fn connection_config(&self, connection_key: &str) -> Option<&ConnectionConfig> {
        self.configs.get(connection_key)
    }

    pub fn secrets(&self) -> &dyn SecretStore {
        self.secrets.as_ref()
    }

    /// Publica las filas de un nodo. Se escribe antes de marcar listos a sus
    /// dependientes.
    pub fn store_rows(&self, address: CollectionAddress, rows: Vec<Row>) -> Arc<Vec<Row>> {
        let rows = Arc::new(rows);
        self.rows.insert(address, rows.clone());
        rows
    }

    pub fn rows(&self, address: &CollectionAddress) -> Option<Arc<Vec<Row>>> {
        self.rows.get(address).map(|r| r.value().clone())
    }

    /// Cierra todos los connectors abiertos.
    pub async fn release(&self) {
        for (key, connector) in &self.connectors {
            connector.close().await;
            debug!("released connection '{key}' for {}", self.privacy_request_id);
        }
    }
}
