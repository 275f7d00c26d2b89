//! Fixture compartida: tres datasets en tres conexiones.
//!
//! a.users (identidad user_id) -> b.orders -> b.order_items
//! c.profiles (identidad email), rama independiente.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dsr_adapters::{InMemoryBackend, InMemoryConnectorFactory, ScriptedWebhookTransport};
use dsr_core::cache::{cache_identity, cache_masking_secrets};
use dsr_core::{Collection, CollectionAddress, ConnectionConfig, Dataset, DatasetConfig, ExecutionConfig, Field, FieldReference,
               IdentitySeed, InMemoryCache, InMemoryExecutionLogStore, InMemoryRepository, Policy, PrivacyRequest,
               PrivacyRequestRunner, Repository, Row};
use dsr_masking::MaskingStrategyRegistry;
use serde_json::json;

pub type Runner = PrivacyRequestRunner<InMemoryRepository, InMemoryCache, InMemoryExecutionLogStore>;

pub fn users() -> CollectionAddress {
    CollectionAddress::new("a", "users")
}
pub fn orders() -> CollectionAddress {
    CollectionAddress::new("b", "orders")
}
pub fn items() -> CollectionAddress {
    CollectionAddress::new("b", "order_items")
}
pub fn profiles() -> CollectionAddress {
    CollectionAddress::new("c", "profiles")
}

pub fn row(v: serde_json::Value) -> Row {
    v.as_object().cloned().expect("object row")
}

pub fn datasets() -> Vec<Dataset> {
    vec![Dataset::new("a",
                      "conn_a",
                      vec![Collection::new("users",
                                           vec![Field::new("user_id").identity("user_id").primary_key(),
                                                Field::new("email").category("user.contact.email").data_type("string")])]),
         Dataset::new("b",
                      "conn_b",
                      vec![Collection::new("orders",
                                           vec![Field::new("id").primary_key(),
                                                Field::new("user_id").references(FieldReference::new("a", "users", "user_id")),
                                                Field::new("address").category("user.contact.address")]),
                           Collection::new("order_items",
                                           vec![Field::new("order_id").references(FieldReference::new("b", "orders", "id")),
                                                Field::new("note").category("user.contact.address")])]),
         Dataset::new("c",
                      "conn_c",
                      vec![Collection::new("profiles",
                                           vec![Field::new("id").primary_key(),
                                                Field::new("email").identity("email").category("user.contact.email"),
                                                Field::new("name").category("user.name")])])]
}

pub fn seed() -> IdentitySeed {
    IdentitySeed::from([("user_id".to_string(), json!("u1")), ("email".to_string(), json!("jane@example.com"))])
}

/// Reintentos rápidos: backoff de 1 ms y timeout de 50 ms por llamada.
pub fn fast_config(max_attempts: u32) -> ExecutionConfig {
    ExecutionConfig::default().with_retry(max_attempts, Duration::from_millis(1))
                              .with_connector_timeout(Duration::from_millis(50))
                              .with_max_concurrent_tasks(1)
}

pub struct Harness {
    pub repo: Arc<InMemoryRepository>,
    pub cache: Arc<InMemoryCache>,
    pub backend: Arc<InMemoryBackend>,
    pub factory: Arc<InMemoryConnectorFactory>,
    pub webhooks: Arc<ScriptedWebhookTransport>,
}

impl Harness {
    pub fn new() -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        for ds in datasets() {
            repo.save_dataset_config(&DatasetConfig::new(ds.name.clone(), ds.clone())).expect("dataset");
            repo.save_connection_config(&ConnectionConfig::new(ds.connection_key.clone(), "memory")).expect("connection");
        }
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert_rows(users(),
                            vec![row(json!({"user_id": "u1", "email": "jane@example.com"})),
                                 row(json!({"user_id": "u2", "email": "other@example.com"}))]);
        backend.insert_rows(orders(),
                            vec![row(json!({"id": 1, "user_id": "u1", "address": "1 Main St"})),
                                 row(json!({"id": 2, "user_id": "u1", "address": "2 Side St"})),
                                 row(json!({"id": 3, "user_id": "u2", "address": "3 Far St"}))]);
        backend.insert_rows(items(), vec![row(json!({"order_id": 1, "note": "leave at door"}))]);
        backend.insert_rows(profiles(), vec![row(json!({"id": 10, "email": "jane@example.com", "name": "Jane"}))]);
        let factory = Arc::new(InMemoryConnectorFactory::new(backend.clone()));
        Self { repo,
               cache: Arc::new(InMemoryCache::new()),
               backend,
               factory,
               webhooks: Arc::new(ScriptedWebhookTransport::new()) }
    }

    pub fn runner(&self, config: ExecutionConfig) -> Runner {
        PrivacyRequestRunner::new(self.repo.clone(),
                                  self.cache.clone(),
                                  InMemoryExecutionLogStore::default(),
                                  self.factory.clone(),
                                  self.webhooks.clone()).with_config(config)
    }

    /// Guarda la política y una solicitud aprobada con identidad y secretos
    /// ya cacheados.
    pub fn approved_request(&self, policy: &Policy, identity: &IdentitySeed) -> PrivacyRequest {
        let request = self.pending_request(policy, identity);
        let strategies = policy.masking_strategies(&MaskingStrategyRegistry::default()).expect("strategies");
        cache_masking_secrets(self.cache.as_ref(), &request.id, &strategies, None).expect("secrets");
        self.approve(request)
    }

    /// Como `approved_request` pero sin cachear secretos de masking.
    pub fn approved_request_without_secrets(&self, policy: &Policy, identity: &IdentitySeed) -> PrivacyRequest {
        let request = self.pending_request(policy, identity);
        self.approve(request)
    }

    fn pending_request(&self, policy: &Policy, identity: &IdentitySeed) -> PrivacyRequest {
        self.repo.save_policy(policy).expect("policy");
        let request = PrivacyRequest::new(policy.key.clone(), None);
        cache_identity(self.cache.as_ref(), &request.id, identity, None).expect("identity");
        request
    }

    fn approve(&self, mut request: PrivacyRequest) -> PrivacyRequest {
        request.approve(None).expect("approve");
        self.repo.save_privacy_request(&request).expect("save");
        request
    }

    pub fn stored(&self, id: &str) -> PrivacyRequest {
        self.repo.get_privacy_request(id).expect("get").expect("exists")
    }
}
