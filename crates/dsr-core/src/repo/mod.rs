//! Acceso a entidades persistidas (políticas, datasets, conexiones y
//! solicitudes). El core sólo depende del trait; la persistencia real es un
//! colaborador externo.

pub mod memory;
pub mod types;

pub use memory::InMemoryRepository;
pub use types::{AccessLevel, ConnectionConfig, DatasetConfig};

use crate::errors::RepositoryError;
use crate::policy::Policy;
use crate::request::PrivacyRequest;

pub trait Repository: Send + Sync {
    fn get_policy(&self, key: &str) -> Result<Option<Policy>, RepositoryError>;
    /// Configuraciones de dataset ordenadas por clave.
    fn get_dataset_configs(&self) -> Result<Vec<DatasetConfig>, RepositoryError>;
    fn get_connection_config(&self, key: &str) -> Result<Option<ConnectionConfig>, RepositoryError>;
    fn get_privacy_request(&self, id: &str) -> Result<Option<PrivacyRequest>, RepositoryError>;

    fn save_policy(&self, policy: &Policy) -> Result<(), RepositoryError>;
    fn save_dataset_config(&self, config: &DatasetConfig) -> Result<(), RepositoryError>;
    fn save_connection_config(&self, config: &ConnectionConfig) -> Result<(), RepositoryError>;
    fn save_privacy_request(&self, request: &PrivacyRequest) -> Result<(), RepositoryError>;

    fn get_dataset_config(&self, key: &str) -> Result<Option<DatasetConfig>, RepositoryError> {
        Ok(self.get_dataset_configs()?.into_iter().find(|c| c.key == key))
    }
}
