//! Servicio de solicitudes de privacidad.
//! Punto de entrada de la aplicación sobre el runner:
//! - Crea solicitudes en lote, cacheando identidad y secretos de masking.
//! - Aprueba/deniega en lote; lo aprobado se ejecuta a continuación.
//! - Reanuda solicitudes pausadas, ejecuta dry-runs y arma reportes.
//!
//! Las operaciones en lote nunca abortan por el fallo de un elemento: cada uno
//! termina en `succeeded` o en `failed` con su motivo.
use std::collections::BTreeMap;

use dsr_core::cache::{cache_identity, cache_masking_secrets};
use dsr_core::constants::BULK_OPERATION_LIMIT;
use dsr_core::request::{review_privacy_requests, BulkFailure, ReviewAction};
use dsr_core::{Cache, CollectionAddress, ExecutionLogStore, ExecutionOutcome, IdentitySeed, PrivacyRequest, PrivacyRequestReport,
               PrivacyRequestRunner, Repository};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Elemento de una creación en lote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyRequestCreate {
    pub external_id: Option<String>,
    pub policy_key: String,
    #[serde(default)]
    pub identity: IdentitySeed,
}

impl PrivacyRequestCreate {
    pub fn new(policy_key: impl Into<String>, identity: IdentitySeed) -> Self {
        Self { external_id: None,
               policy_key: policy_key.into(),
               identity }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub succeeded: Vec<PrivacyRequest>,
    pub failed: Vec<BulkFailure>,
}

pub struct PrivacyRequestService<R, C, L>
    where R: Repository,
          C: Cache + 'static,
          L: ExecutionLogStore
{
    runner: PrivacyRequestRunner<R, C, L>,
    config: AppConfig,
}

impl<R, C, L> PrivacyRequestService<R, C, L>
    where R: Repository,
          C: Cache + 'static,
          L: ExecutionLogStore
{
    /// El runner recibe la `ExecutionConfig` contenida en `config`.
    pub fn new(runner: PrivacyRequestRunner<R, C, L>, config: AppConfig) -> Self {
        let runner = runner.with_config(config.execution.clone());
        Self { runner, config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn runner(&self) -> &PrivacyRequestRunner<R, C, L> {
        &self.runner
    }

    fn check_limit(len: usize) -> Result<(), ServiceError> {
        if len > BULK_OPERATION_LIMIT {
            return Err(ServiceError::BulkLimit { limit: BULK_OPERATION_LIMIT,
                                                 got: len });
        }
        Ok(())
    }

    pub fn get_privacy_request(&self, id: &str) -> Result<PrivacyRequest, ServiceError> {
        self.runner
            .repository()
            .get_privacy_request(id)?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    /// Crea hasta `BULK_OPERATION_LIMIT` solicitudes. Sin aprobación manual,
    /// cada solicitud creada se aprueba y ejecuta antes de pasar a la
    /// siguiente.
    pub async fn create_privacy_requests(&mut self, items: Vec<PrivacyRequestCreate>) -> Result<BulkResponse, ServiceError> {
        Self::check_limit(items.len())?;
        let mut response = BulkResponse::default();
        for item in items {
            let data = json!(item);
            if item.identity.values().all(|v| v.is_null()) {
                response.failed
                        .push(BulkFailure::new("You must provide at least one identity to process", data));
                continue;
            }
            let policy = match self.runner.repository().get_policy(&item.policy_key) {
                Ok(Some(p)) => p,
                Ok(None) => {
                    response.failed
                            .push(BulkFailure::new(format!("Policy with key {} does not exist", item.policy_key), data));
                    continue;
                }
                Err(e) => {
                    warn!("policy lookup for {} failed: {e}", item.policy_key);
                    response.failed.push(BulkFailure::new("This record could not be added", data));
                    continue;
                }
            };
            let request = match self.store_new_request(&item, &policy) {
                Ok(r) => r,
                Err(e) => {
                    warn!("privacy request could not be created: {e}");
                    response.failed.push(BulkFailure::new("This record could not be added", data));
                    continue;
                }
            };
            info!("created privacy request {}", request.id);
            if self.config.require_manual_request_approval {
                response.succeeded.push(request);
                continue;
            }
            let approved = review_privacy_requests(self.runner.repository().as_ref(),
                                                   std::slice::from_ref(&request.id),
                                                   ReviewAction::Approve,
                                                   None);
            if let Some(failure) = approved.failed.into_iter().next() {
                response.failed.push(failure);
                continue;
            }
            response.succeeded.push(self.execute_and_reload(&request.id).await?);
        }
        Ok(response)
    }

    fn store_new_request(&self, item: &PrivacyRequestCreate, policy: &dsr_core::Policy) -> Result<PrivacyRequest, ServiceError> {
        let request = PrivacyRequest::new(item.policy_key.clone(), item.external_id.clone());
        let cache = self.runner.cache().as_ref();
        cache_identity(cache, &request.id, &item.identity, Some(self.config.execution.identity_ttl))?;
        let strategies = policy.masking_strategies(self.runner.registry())?;
        cache_masking_secrets(cache, &request.id, &strategies, Some(self.config.masking_secret_ttl))?;
        self.runner.repository().save_privacy_request(&request)?;
        Ok(request)
    }

    /// Ejecuta una solicitud ya aprobada y devuelve su estado guardado. Un
    /// fallo de ejecución queda reflejado en la propia solicitud.
    async fn execute_and_reload(&mut self, id: &str) -> Result<PrivacyRequest, ServiceError> {
        if let Err(e) = self.runner.execute(id).await {
            warn!("privacy request {id} did not run: {e}");
        }
        self.get_privacy_request(id)
    }

    /// Aprueba en lote y ejecuta cada solicitud aprobada.
    pub async fn approve_privacy_requests(&mut self, ids: &[String], reviewer: Option<&str>) -> Result<BulkResponse, ServiceError> {
        Self::check_limit(ids.len())?;
        let reviewed = review_privacy_requests(self.runner.repository().as_ref(), ids, ReviewAction::Approve, reviewer);
        let mut response = BulkResponse { succeeded: Vec::with_capacity(reviewed.succeeded.len()),
                                          failed: reviewed.failed };
        for request in reviewed.succeeded {
            response.succeeded.push(self.execute_and_reload(&request.id).await?);
        }
        Ok(response)
    }

    pub fn deny_privacy_requests(&self, ids: &[String], reviewer: Option<&str>) -> Result<BulkResponse, ServiceError> {
        Self::check_limit(ids.len())?;
        let reviewed = review_privacy_requests(self.runner.repository().as_ref(), ids, ReviewAction::Deny, reviewer);
        Ok(BulkResponse { succeeded: reviewed.succeeded,
                          failed: reviewed.failed })
    }

    pub async fn resume(&mut self, id: &str, webhook_key: Option<&str>, derived_identity: &IdentitySeed) -> Result<ExecutionOutcome, ServiceError> {
        Ok(self.runner.resume(id, webhook_key, derived_identity).await?)
    }

    pub fn dry_run(&self, dataset_keys: &[String]) -> Result<BTreeMap<CollectionAddress, String>, ServiceError> {
        Ok(self.runner.dry_run(dataset_keys)?)
    }

    /// Reporte de la solicitud; con `verbose` incluye su execution log.
    pub fn report(&self, id: &str, verbose: bool) -> Result<PrivacyRequestReport, ServiceError> {
        let request = self.get_privacy_request(id)?;
        let logs = self.runner.execution_logs(id);
        Ok(PrivacyRequestReport::build(request, &logs, verbose))
    }
}
