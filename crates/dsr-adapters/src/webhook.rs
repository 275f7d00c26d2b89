use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::DashMap;
use dsr_core::errors::WebhookError;
use dsr_core::{PolicyPreWebhook, WebhookRequest, WebhookResponse, WebhookTransport};

/// Transporte de webhooks con respuestas programadas por clave. Sin guion,
/// responde sin detener la solicitud.
#[derive(Debug, Default)]
pub struct ScriptedWebhookTransport {
    script: DashMap<String, VecDeque<Result<WebhookResponse, WebhookError>>>,
    calls: DashMap<String, Vec<WebhookRequest>>,
}

impl ScriptedWebhookTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, webhook_key: impl Into<String>, response: Result<WebhookResponse, WebhookError>) {
        self.script.entry(webhook_key.into()).or_default().push_back(response);
    }

    pub fn halt_once(&self, webhook_key: impl Into<String>) {
        self.respond(webhook_key, Ok(WebhookResponse { halt: true,
                                                       ..Default::default() }));
    }

    /// Peticiones recibidas por `webhook_key`.
    pub fn calls(&self, webhook_key: &str) -> Vec<WebhookRequest> {
        self.calls.get(webhook_key).map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl WebhookTransport for ScriptedWebhookTransport {
    async fn call(&self, webhook: &PolicyPreWebhook, request: &WebhookRequest) -> Result<WebhookResponse, WebhookError> {
        self.calls.entry(webhook.key.clone()).or_default().push(request.clone());
        let scripted = self.script.get_mut(&webhook.key).and_then(|mut q| q.pop_front());
        scripted.unwrap_or_else(|| Ok(WebhookResponse::default()))
    }
}
