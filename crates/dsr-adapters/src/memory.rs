use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dsr_core::graph::GraphNode;
use dsr_core::{CollectionAddress, ConnectionConfig, Connector, ConnectorError, ConnectorFactory, QueryPlan, Row};
use log::debug;

/// Comportamiento programado para la próxima llamada a una colección.
#[derive(Debug, Clone)]
pub enum Fault {
    Fail(ConnectorError),
    Delay(Duration),
    /// Simula un driver que entra en pánico dentro de la tarea.
    Panic(String),
}

/// Tablas en memoria indexadas por colección.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: DashMap<CollectionAddress, Vec<Row>>,
    query_faults: DashMap<CollectionAddress, VecDeque<Fault>>,
    update_faults: DashMap<CollectionAddress, VecDeque<Fault>>,
    query_calls: DashMap<CollectionAddress, usize>,
    updates: DashMap<CollectionAddress, Vec<(Row, Row)>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_rows(&self, address: CollectionAddress, rows: Vec<Row>) {
        self.tables.entry(address).or_default().extend(rows);
    }

    /// Encola fallos consumidos uno por llamada a `query`.
    pub fn push_query_faults(&self, address: CollectionAddress, faults: impl IntoIterator<Item = Fault>) {
        self.query_faults.entry(address).or_default().extend(faults);
    }

    pub fn push_update_faults(&self, address: CollectionAddress, faults: impl IntoIterator<Item = Fault>) {
        self.update_faults.entry(address).or_default().extend(faults);
    }

    pub fn query_calls(&self, address: &CollectionAddress) -> usize {
        self.query_calls.get(address).map(|c| *c).unwrap_or(0)
    }

    pub fn total_query_calls(&self) -> usize {
        self.query_calls.iter().map(|e| *e.value()).sum()
    }

    pub fn rows(&self, address: &CollectionAddress) -> Vec<Row> {
        self.tables.get(address).map(|t| t.clone()).unwrap_or_default()
    }

    /// `(filtros, valores)` aplicados por `update`, en orden.
    pub fn updates(&self, address: &CollectionAddress) -> Vec<(Row, Row)> {
        self.updates.get(address).map(|u| u.clone()).unwrap_or_default()
    }

    async fn apply_fault(faults: &DashMap<CollectionAddress, VecDeque<Fault>>, address: &CollectionAddress) -> Result<(), ConnectorError> {
        let next = faults.get_mut(address).and_then(|mut q| q.pop_front());
        match next {
            Some(Fault::Fail(e)) => Err(e),
            Some(Fault::Delay(d)) => {
                tokio::time::sleep(d).await;
                Ok(())
            }
            Some(Fault::Panic(message)) => panic!("{message}"),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryConnector {
    key: String,
    backend: Arc<InMemoryBackend>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn query(&self, node: &GraphNode, plan: &QueryPlan) -> Result<Vec<Row>, ConnectorError> {
        *self.backend.query_calls.entry(node.address.clone()).or_default() += 1;
        InMemoryBackend::apply_fault(&self.backend.query_faults, &node.address).await?;
        let rows: Vec<Row> = self.backend
                                 .rows(&node.address)
                                 .into_iter()
                                 .filter(|r| plan.matches(r))
                                 .map(|r| r.into_iter().filter(|(k, _)| plan.fields.contains(k)).collect())
                                 .collect();
        debug!("[{}] {} -> {} rows", self.key, plan.render(), rows.len());
        Ok(rows)
    }

    async fn update(&self, node: &GraphNode, filters: &Row, values: &Row) -> Result<usize, ConnectorError> {
        InMemoryBackend::apply_fault(&self.backend.update_faults, &node.address).await?;
        let mut count = 0;
        if let Some(mut table) = self.backend.tables.get_mut(&node.address) {
            for row in table.iter_mut().filter(|r| filters.iter().all(|(k, v)| r.get(k) == Some(v))) {
                for (k, v) in values {
                    row.insert(k.clone(), v.clone());
                }
                count += 1;
            }
        }
        self.backend
            .updates
            .entry(node.address.clone())
            .or_default()
            .push((filters.clone(), values.clone()));
        Ok(count)
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory que entrega conectores sobre un mismo `InMemoryBackend` y cuenta
/// aperturas y cierres.
#[derive(Debug, Default)]
pub struct InMemoryConnectorFactory {
    backend: Arc<InMemoryBackend>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    refused: DashMap<String, ConnectorError>,
}

impl InMemoryConnectorFactory {
    pub fn new(backend: Arc<InMemoryBackend>) -> Self {
        Self { backend,
               opened: AtomicUsize::new(0),
               closed: Arc::new(AtomicUsize::new(0)),
               refused: DashMap::new() }
    }

    pub fn backend(&self) -> &Arc<InMemoryBackend> {
        &self.backend
    }

    /// Las conexiones con esta clave fallan al abrirse.
    pub fn refuse(&self, connection_key: impl Into<String>, error: ConnectorError) {
        self.refused.insert(connection_key.into(), error);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectorFactory for InMemoryConnectorFactory {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connector>, ConnectorError> {
        if let Some(e) = self.refused.get(&config.key) {
            return Err(e.clone());
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(InMemoryConnector { key: config.key.clone(),
                                        backend: self.backend.clone(),
                                        closed: self.closed.clone() }))
    }
}
