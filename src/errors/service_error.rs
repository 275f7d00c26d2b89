use dsr_core::{CacheError, ExecutionError, RepositoryError, RequestStateError, ValidationError};
use dsr_masking::MaskingError;
use thiserror::Error;

/// Errores del servicio de solicitudes.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Bulk operations are limited to {limit} items, got {got}")]
    BulkLimit { limit: usize, got: usize },
    #[error("No privacy request found with id '{0}'.")]
    NotFound(String),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    State(#[from] RequestStateError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Masking(#[from] MaskingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_limit_format() {
        let err = ServiceError::BulkLimit { limit: 50, got: 51 };
        assert_eq!(err.to_string(), "Bulk operations are limited to 50 items, got 51");
    }

    #[test]
    fn repository_error_converts() {
        let err: ServiceError = RepositoryError::NotFound("policy 'x'".into()).into();
        assert!(matches!(err, ServiceError::Repository(_)));
    }
}
