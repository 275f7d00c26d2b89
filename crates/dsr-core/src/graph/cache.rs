//! Cache de grafos por firma del conjunto de datasets.

use std::sync::Arc;

use dashmap::DashMap;

use super::{Dataset, DatasetGraph};
use crate::errors::ValidationError;
use crate::hashing::hash_value;

#[derive(Debug, Default)]
pub struct DatasetGraphCache {
    graphs: DashMap<String, Arc<DatasetGraph>>,
}

impl DatasetGraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Devuelve el grafo cacheado para `datasets` o lo construye.
    pub fn get_or_build(&self, datasets: &[Dataset]) -> Result<Arc<DatasetGraph>, ValidationError> {
        let key = hash_value(&serde_json::to_value(datasets).unwrap_or_default());
        if let Some(g) = self.graphs.get(&key) {
            return Ok(g.clone());
        }
        let graph = Arc::new(DatasetGraph::build(datasets)?);
        self.graphs.insert(key, graph.clone());
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}
