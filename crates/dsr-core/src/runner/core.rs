//! Implementación del runner.
//!
//! `execute` requiere una solicitud `approved`; `resume` una `paused`. Ambos
//! terminan en `paused`, `complete` o `error` y dejan la solicitud guardada.
//! Los fallos de planificación o de nodos se convierten en estado `error`;
//! las políticas inválidas además se devuelven como `ExecutionError`.

use std::collections::BTreeMap;
use std::sync::Arc;

use dsr_masking::MaskingStrategyRegistry;
use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinSet;

use super::{CancelFlag, ExecutionOutcome, WebhookRequest, WebhookTransport};
use crate::cache::{cache_identity, checkpoint_key, get_cached_identity, Cache, CacheSecretStore};
use crate::config::{ExecutionConfig, ExecutionMode};
use crate::constants::DRY_RUN_IDENTITY_VALUE;
use crate::errors::{CacheError, ExecutionError, RepositoryError, RequestStateError, WebhookError};
use crate::execution_log::{ExecutionLogEntry, ExecutionLogStore, NodeEvent};
use crate::graph::{CollectionAddress, Dataset, DatasetGraph, DatasetGraphCache};
use crate::policy::{ActionType, Policy};
use crate::repo::Repository;
use crate::request::{PrivacyRequest, PrivacyRequestStatus};
use crate::task::{build_erasure_rules, filter_access_results, run_access_node, run_erasure_node, AccessRun, ConnectorFactory,
                  ErasureOutcome, TaskResources};
use crate::traversal::{dry_run_graph, DryRunError, IdentitySeed, NodeStatus, Traversal, TraversalCheckpoint};

pub const CANCELLED_REASON: &str = "cancelled";

/// Desde qué webhook previo continuar.
enum WebhookCursor {
    All,
    After(String),
    Skip,
}

/// Cómo terminó la fase de acceso.
#[derive(Default)]
struct DriveReport {
    failed: Vec<CollectionAddress>,
    paused: bool,
    cancelled: bool,
}

pub struct PrivacyRequestRunner<R, C, L>
    where R: Repository,
          C: Cache + 'static,
          L: ExecutionLogStore
{
    repo: Arc<R>,
    cache: Arc<C>,
    log: L,
    connectors: Arc<dyn ConnectorFactory>,
    webhooks: Arc<dyn WebhookTransport>,
    registry: Arc<MaskingStrategyRegistry>,
    graphs: DatasetGraphCache,
    config: ExecutionConfig,
}

impl<R, C, L> PrivacyRequestRunner<R, C, L>
    where R: Repository,
          C: Cache + 'static,
          L: ExecutionLogStore
{
    pub fn new(repo: Arc<R>, cache: Arc<C>, log: L, connectors: Arc<dyn ConnectorFactory>, webhooks: Arc<dyn WebhookTransport>) -> Self {
        Self { repo,
               cache,
               log,
               connectors,
               webhooks,
               registry: Arc::new(MaskingStrategyRegistry::default()),
               graphs: DatasetGraphCache::new(),
               config: ExecutionConfig::default() }
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: Arc<MaskingStrategyRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn registry(&self) -> &MaskingStrategyRegistry {
        &self.registry
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    pub fn execution_logs(&self, privacy_request_id: &str) -> Vec<ExecutionLogEntry> {
        self.log.list(privacy_request_id)
    }

    fn load_request(&self, id: &str) -> Result<PrivacyRequest, ExecutionError> {
        self.repo
            .get_privacy_request(id)?
            .ok_or_else(|| ExecutionError::RequestNotFound(id.to_string()))
    }

    pub async fn execute(&mut self, privacy_request_id: &str) -> Result<ExecutionOutcome, ExecutionError> {
        self.execute_cancellable(privacy_request_id, &CancelFlag::new()).await
    }

    pub async fn execute_cancellable(&mut self, privacy_request_id: &str, cancel: &CancelFlag) -> Result<ExecutionOutcome, ExecutionError> {
        let mut request = self.load_request(privacy_request_id)?;
        request.start_processing()?;
        self.repo.save_privacy_request(&request)?;
        info!("processing privacy request {}", request.id);
        self.process(request, WebhookCursor::All, cancel).await
    }

    /// Reanuda una solicitud pausada. `webhook_key`, si se indica, debe ser
    /// el webhook donde quedó pausada. La identidad derivada se fusiona con
    /// la cacheada antes de continuar.
    pub async fn resume(&mut self,
                        privacy_request_id: &str,
                        webhook_key: Option<&str>,
                        derived_identity: &IdentitySeed)
                        -> Result<ExecutionOutcome, ExecutionError> {
        let mut request = self.load_request(privacy_request_id)?;
        if request.status != PrivacyRequestStatus::Paused {
            return Err(RequestStateError::InvalidResume { id: request.id.clone(),
                                                          status: request.status }.into());
        }
        if let Some(key) = webhook_key {
            if request.paused_at_webhook.as_deref() != Some(key) {
                return Err(RequestStateError::WebhookMismatch { id: request.id.clone(),
                                                                webhook: key.to_string() }.into());
            }
        }
        cache_identity(self.cache.as_ref(), &request.id, derived_identity, Some(self.config.identity_ttl))?;
        let cursor = match request.paused_at_webhook.take() {
            Some(key) => WebhookCursor::After(key),
            None => WebhookCursor::Skip,
        };
        request.resume()?;
        self.repo.save_privacy_request(&request)?;
        info!("resuming privacy request {}", request.id);
        self.process(request, cursor, &CancelFlag::new()).await
    }

    /// Consultas que se ejecutarían para `dataset_keys` (todos si está
    /// vacío), sembrando cada identity key con un valor marcador.
    pub fn dry_run(&self, dataset_keys: &[String]) -> Result<BTreeMap<CollectionAddress, String>, ExecutionError> {
        let datasets = self.datasets(dataset_keys)?;
        let graph = self.graphs.get_or_build(&datasets)?;
        let seed: IdentitySeed = graph.identity_keys()
                                      .values()
                                      .map(|k| (k.clone(), Value::String(DRY_RUN_IDENTITY_VALUE.to_string())))
                                      .collect();
        dry_run_graph(graph, &seed).map_err(|e| match e {
                                       DryRunError::Validation(v) => ExecutionError::Validation(v),
                                       DryRunError::Traversal(t) => ExecutionError::Traversal(t),
                                   })
    }

    fn datasets(&self, keys: &[String]) -> Result<Vec<Dataset>, ExecutionError> {
        let configs = self.repo.get_dataset_configs()?;
        if keys.is_empty() {
            return Ok(configs.into_iter().map(|c| c.dataset).collect());
        }
        keys.iter()
            .map(|k| {
                configs.iter()
                       .find(|c| &c.key == k)
                       .map(|c| c.dataset.clone())
                       .ok_or_else(|| ExecutionError::Repository(RepositoryError::NotFound(format!("dataset '{k}'"))))
            })
            .collect()
    }

    fn finish(&self, mut request: PrivacyRequest, mut outcome: ExecutionOutcome, failure: Option<String>) -> Result<ExecutionOutcome, ExecutionError> {
        match failure {
            Some(reason) => {
                error!("privacy request {} failed: {reason}", request.id);
                request.error(reason.clone())?;
                outcome.failure_reason = Some(reason);
            }
            None => {
                request.complete()?;
                info!("privacy request {} complete", request.id);
            }
        }
        self.repo.save_privacy_request(&request)?;
        self.cache.delete(&checkpoint_key(&request.id))?;
        outcome.status = request.status;
        Ok(outcome)
    }

    /// Ejecuta la solicitud ya marcada `in_processing`. Cualquier error que
    /// la deje en ese estado la pasa a `error` antes de propagarse.
    async fn process(&mut self, request: PrivacyRequest, cursor: WebhookCursor, cancel: &CancelFlag) -> Result<ExecutionOutcome, ExecutionError> {
        let id = request.id.clone();
        let result = self.run_request(request, cursor, cancel).await;
        if let Err(e) = &result {
            self.fail_in_flight(&id, e);
        }
        result
    }

    fn fail_in_flight(&self, id: &str, cause: &ExecutionError) {
        let mut request = match self.repo.get_privacy_request(id) {
            Ok(Some(r)) if r.status == PrivacyRequestStatus::InProcessing => r,
            Ok(_) => return,
            Err(e) => {
                error!("privacy request {id} could not be reloaded after '{cause}': {e}");
                return;
            }
        };
        if let Err(e) = request.error(cause.to_string()) {
            warn!("privacy request {id}: {e}");
            return;
        }
        match self.repo.save_privacy_request(&request) {
            Ok(()) => error!("privacy request {id} failed: {cause}"),
            Err(e) => error!("privacy request {id} could not be marked error: {e}"),
        }
        if let Err(e) = self.cache.delete(&checkpoint_key(id)) {
            warn!("checkpoint of {id} not cleared: {e}");
        }
    }

    async fn run_request(&mut self, mut request: PrivacyRequest, cursor: WebhookCursor, cancel: &CancelFlag) -> Result<ExecutionOutcome, ExecutionError> {
        let mut outcome = ExecutionOutcome::new(&request.id, request.status);

        let Some(policy) = self.repo.get_policy(&request.policy_key)? else {
            let reason = format!("Policy with key {} does not exist", request.policy_key);
            return self.finish(request, outcome, Some(reason));
        };
        if let Err(e) = policy.validate(&self.registry) {
            request.error(e.to_string())?;
            self.repo.save_privacy_request(&request)?;
            return Err(e.into());
        }

        let halted = match self.run_pre_webhooks(&request, &policy, cursor).await {
            Ok(h) => h,
            Err(ExecutionError::Webhook(e)) => return self.finish(request, outcome, Some(e.to_string())),
            Err(e) => return Err(e),
        };
        if let Some(hook) = halted {
            request.pause(Some(hook.clone()))?;
            self.repo.save_privacy_request(&request)?;
            info!("privacy request {} paused at webhook {hook}", request.id);
            outcome.status = request.status;
            return Ok(outcome);
        }

        let datasets = self.datasets(&[])?;
        let graph = match self.graphs.get_or_build(&datasets) {
            Ok(g) => g,
            Err(e) => {
                request.error(e.to_string())?;
                self.repo.save_privacy_request(&request)?;
                return Err(e.into());
            }
        };
        let seed = get_cached_identity(self.cache.as_ref(), &request.id)?;
        let checkpoint = self.load_checkpoint(&request.id)?;
        let planned = match &checkpoint {
            Some(cp) => Traversal::restore(graph.clone(), &seed, cp),
            None => Traversal::new(graph.clone(), &seed),
        };
        let mut traversal = match planned {
            Ok(t) => t,
            Err(e) => return self.finish(request, outcome, Some(e.to_string())),
        };

        let policy = Arc::new(policy);
        let cache: Arc<dyn Cache> = self.cache.clone();
        let secrets = Arc::new(CacheSecretStore::new(cache));
        let resources = Arc::new(TaskResources::acquire(&request.id,
                                                        policy.clone(),
                                                        &graph,
                                                        self.repo.as_ref(),
                                                        self.connectors.as_ref(),
                                                        secrets).await?);
        if let Some(cp) = &checkpoint {
            for done in &cp.completed {
                resources.store_rows(done.address.clone(), done.rows.clone());
            }
        }

        let result = self.run_phases(&request.id, &graph, &policy, &mut traversal, resources.clone(), cancel, &mut outcome)
                         .await;
        resources.release().await;
        let report = result?;
        outcome.node_statuses = traversal.statuses();
        outcome.failed_nodes = report.failed.clone();

        if report.paused {
            let cp = TraversalCheckpoint::capture(&traversal, |a| resources.rows(a).map(|r| r.as_ref().clone()).unwrap_or_default());
            let encoded = serde_json::to_string(&cp).map_err(|e| CacheError::Decode(e.to_string()))?;
            self.cache.set(&checkpoint_key(&request.id), encoded, Some(self.config.checkpoint_ttl))?;
            request.pause(None)?;
            self.repo.save_privacy_request(&request)?;
            info!("privacy request {} paused with {} completed nodes", request.id, cp.completed.len());
            outcome.status = request.status;
            return Ok(outcome);
        }

        let failure = if report.cancelled {
            Some(CANCELLED_REASON.to_string())
        } else if !report.failed.is_empty() {
            let names: Vec<String> = report.failed.iter().map(ToString::to_string).collect();
            Some(format!("{} node(s) failed: {}", names.len(), names.join(", ")))
        } else {
            None
        };
        self.finish(request, outcome, failure)
    }

    /// Llama a los webhooks previos desde `cursor`. Devuelve la clave del
    /// webhook que pidió detener la solicitud, si alguno lo hizo.
    async fn run_pre_webhooks(&self, request: &PrivacyRequest, policy: &Policy, cursor: WebhookCursor) -> Result<Option<String>, ExecutionError> {
        let hooks = policy.ordered_pre_webhooks();
        let start = match cursor {
            WebhookCursor::All => 0,
            WebhookCursor::Skip => hooks.len(),
            WebhookCursor::After(key) => hooks.iter().position(|h| h.key == key).map_or(0, |i| i + 1),
        };
        for hook in &hooks[start..] {
            let identity = get_cached_identity(self.cache.as_ref(), &request.id)?;
            let payload = WebhookRequest { privacy_request_id: request.id.clone(),
                                           identity };
            let response = match tokio::time::timeout(self.config.connector_timeout, self.webhooks.call(hook, &payload)).await {
                Ok(r) => r?,
                Err(_) => return Err(WebhookError::Timeout(hook.key.clone()).into()),
            };
            if !response.derived_identity.is_empty() {
                cache_identity(self.cache.as_ref(), &request.id, &response.derived_identity, Some(self.config.identity_ttl))?;
            }
            debug!("webhook {} answered halt={}", hook.key, response.halt);
            if response.halt {
                return Ok(Some(hook.key.clone()));
            }
        }
        Ok(None)
    }

    fn load_checkpoint(&self, id: &str) -> Result<Option<TraversalCheckpoint>, ExecutionError> {
        let Some(raw) = self.cache.get(&checkpoint_key(id))? else { return Ok(None) };
        let cp = serde_json::from_str(&raw).map_err(|e| CacheError::Decode(e.to_string()))?;
        Ok(Some(cp))
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_phases(&mut self,
                        request_id: &str,
                        graph: &Arc<DatasetGraph>,
                        policy: &Policy,
                        traversal: &mut Traversal,
                        resources: Arc<TaskResources>,
                        cancel: &CancelFlag,
                        outcome: &mut ExecutionOutcome)
                        -> Result<DriveReport, ExecutionError> {
        let mut report = self.drive_access(request_id, traversal, resources.clone(), cancel).await?;
        if report.paused || report.cancelled {
            return Ok(report);
        }
        let proceed = report.failed.is_empty() || self.config.mode == ExecutionMode::BestEffort;
        if proceed && policy.has_action(ActionType::Erasure) {
            let failed = self.run_erasure(request_id, traversal, resources.clone(), policy, outcome).await?;
            report.failed.extend(failed);
        }
        for rule in policy.rules_for(ActionType::Access) {
            outcome.access_results
                   .insert(rule.key.clone(), filter_access_results(graph, &resources, rule));
        }
        Ok(report)
    }

    fn drain_events(&mut self, request_id: &str, rx: &mut UnboundedReceiver<NodeEvent>) {
        while let Ok(event) = rx.try_recv() {
            self.log.append(request_id, event);
        }
    }

    /// Como `drain_events`, reflejando además los reintentos en el recorrido.
    fn drain_access_events(&mut self, request_id: &str, traversal: &mut Traversal, rx: &mut UnboundedReceiver<NodeEvent>) {
        while let Ok(event) = rx.try_recv() {
            if event.status == NodeStatus::Retrying {
                traversal.mark_retrying(&event.address);
            }
            self.log.append(request_id, event);
        }
    }

    fn log_event(&mut self, request_id: &str, address: &CollectionAddress, action: ActionType, status: NodeStatus, message: Option<String>) {
        let mut event = NodeEvent::new(address.clone(), action, status);
        event.message = message;
        self.log.append(request_id, event);
    }

    /// Fase de acceso: ejecuta los nodos listos de forma concurrente (hasta
    /// `max_concurrent_tasks`) y propaga sus filas al completar.
    async fn drive_access(&mut self,
                          request_id: &str,
                          traversal: &mut Traversal,
                          resources: Arc<TaskResources>,
                          cancel: &CancelFlag)
                          -> Result<DriveReport, ExecutionError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks: JoinSet<AccessRun> = JoinSet::new();
        let mut report = DriveReport::default();
        let mut stop = false;
        let limit = self.config.max_concurrent_tasks.max(1);

        loop {
            if !stop && cancel.is_cancelled() {
                warn!("privacy request {request_id} cancelled");
                report.cancelled = true;
                stop = true;
            }
            if !stop {
                let capacity = limit.saturating_sub(tasks.len());
                for node in traversal.take_ready(capacity) {
                    self.log_event(request_id, node.address(), ActionType::Access, NodeStatus::Running, None);
                    tasks.spawn(run_access_node(node,
                                                resources.clone(),
                                                self.config.retry.clone(),
                                                self.config.connector_timeout,
                                                tx.clone()));
                }
            }
            let Some(joined) = tasks.join_next().await else { break };
            self.drain_access_events(request_id, traversal, &mut rx);
            let run = joined.map_err(|e| ExecutionError::Internal(e.to_string()))?;
            match run.result {
                Ok(rows) => {
                    traversal.complete(&run.address, &rows);
                    self.log_event(request_id,
                                   &run.address,
                                   ActionType::Access,
                                   NodeStatus::Complete,
                                   Some(format!("{} rows", rows.len())));
                }
                Err(e) if e.is_pause() => {
                    traversal.mark_paused(&run.address);
                    self.log_event(request_id, &run.address, ActionType::Access, NodeStatus::Paused, Some(e.to_string()));
                    report.paused = true;
                    stop = true;
                }
                Err(e) => {
                    warn!("{} failed: {e}", run.address);
                    self.log_event(request_id, &run.address, ActionType::Access, NodeStatus::Error, Some(e.to_string()));
                    for skipped in traversal.mark_error(&run.address) {
                        self.log_event(request_id,
                                       &skipped,
                                       ActionType::Access,
                                       NodeStatus::Skipped,
                                       Some(format!("upstream {} failed", run.address)));
                    }
                    report.failed.push(run.address);
                    if self.config.mode == ExecutionMode::Strict {
                        stop = true;
                    }
                }
            }
        }
        self.drain_access_events(request_id, traversal, &mut rx);

        if (report.cancelled || !report.failed.is_empty()) && !report.paused {
            let reason = if report.cancelled { CANCELLED_REASON } else { "execution stopped after a node failure" };
            for skipped in traversal.skip_remaining() {
                self.log_event(request_id, &skipped, ActionType::Access, NodeStatus::Skipped, Some(reason.to_string()));
            }
        }
        Ok(report)
    }

    /// Fase de borrado: secuencial, en orden de completitud, sobre los nodos
    /// cuyo acceso completó. Devuelve los nodos que fallaron.
    async fn run_erasure(&mut self,
                         request_id: &str,
                         traversal: &Traversal,
                         resources: Arc<TaskResources>,
                         policy: &Policy,
                         outcome: &mut ExecutionOutcome)
                         -> Result<Vec<CollectionAddress>, ExecutionError> {
        let rules = build_erasure_rules(policy, &self.registry)?;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut failed = Vec::new();
        let order: Vec<CollectionAddress> = traversal.completion_order().to_vec();
        for address in order {
            let Some(node) = traversal.graph().node(&address).cloned() else { continue };
            self.log_event(request_id, &address, ActionType::Erasure, NodeStatus::Running, None);
            let result = run_erasure_node(node,
                                          resources.clone(),
                                          &rules,
                                          &self.config.retry,
                                          self.config.connector_timeout,
                                          &tx).await;
            self.drain_events(request_id, &mut rx);
            match result {
                Ok(ErasureOutcome::Masked { rows, message }) => {
                    outcome.erasure_counts.insert(address.clone(), rows);
                    let message = message.or_else(|| Some(format!("{rows} rows masked")));
                    self.log_event(request_id, &address, ActionType::Erasure, NodeStatus::Complete, message);
                }
                Ok(ErasureOutcome::Skipped(message)) => {
                    self.log_event(request_id, &address, ActionType::Erasure, NodeStatus::Skipped, Some(message));
                }
                Err(e) => {
                    warn!("erasure of {address} failed: {e}");
                    self.log_event(request_id, &address, ActionType::Erasure, NodeStatus::Error, Some(e.to_string()));
                    failed.push(address);
                    if self.config.mode == ExecutionMode::Strict {
                        break;
                    }
                }
            }
        }
        Ok(failed)
    }
}
