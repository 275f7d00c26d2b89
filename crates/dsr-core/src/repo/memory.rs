use dashmap::DashMap;

use super::{ConnectionConfig, DatasetConfig, Repository};
use crate::errors::RepositoryError;
use crate::policy::Policy;
use crate::request::PrivacyRequest;

/// Repositorio en memoria, seguro entre hilos.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    policies: DashMap<String, Policy>,
    datasets: DashMap<String, DatasetConfig>,
    connections: DashMap<String, ConnectionConfig>,
    requests: DashMap<String, PrivacyRequest>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }
}

impl Repository for InMemoryRepository {
    fn get_policy(&self, key: &str) -> Result<Option<Policy>, RepositoryError> {
        Ok(self.policies.get(key).map(|p| p.clone()))
    }

    fn get_dataset_configs(&self) -> Result<Vec<DatasetConfig>, RepositoryError> {
        let mut all: Vec<DatasetConfig> = self.datasets.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(all)
    }

    fn get_connection_config(&self, key: &str) -> Result<Option<ConnectionConfig>, RepositoryError> {
        Ok(self.connections.get(key).map(|c| c.clone()))
    }

    fn get_privacy_request(&self, id: &str) -> Result<Option<PrivacyRequest>, RepositoryError> {
        Ok(self.requests.get(id).map(|r| r.clone()))
    }

    fn save_policy(&self, policy: &Policy) -> Result<(), RepositoryError> {
        self.policies.insert(policy.key.clone(), policy.clone());
        Ok(())
    }

    fn save_dataset_config(&self, config: &DatasetConfig) -> Result<(), RepositoryError> {
        self.datasets.insert(config.key.clone(), config.clone());
        Ok(())
    }

    fn save_connection_config(&self, config: &ConnectionConfig) -> Result<(), RepositoryError> {
        self.connections.insert(config.key.clone(), config.clone());
        Ok(())
    }

    fn save_privacy_request(&self, request: &PrivacyRequest) -> Result<(), RepositoryError> {
        self.requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    fn get_dataset_config(&self, key: &str) -> Result<Option<DatasetConfig>, RepositoryError> {
        Ok(self.datasets.get(key).map(|c| c.clone()))
    }
}
