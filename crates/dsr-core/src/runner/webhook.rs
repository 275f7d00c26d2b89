//! Frontera con los webhooks previos a la ejecución. El transporte es un
//! colaborador externo; el runner sólo interpreta la respuesta.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::WebhookError;
use crate::policy::PolicyPreWebhook;
use crate::traversal::IdentitySeed;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookRequest {
    pub privacy_request_id: String,
    pub identity: IdentitySeed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookResponse {
    /// El receptor pide detener la solicitud hasta una reanudación externa.
    #[serde(default)]
    pub halt: bool,
    /// Identidad adicional a fusionar con la cacheada.
    #[serde(default)]
    pub derived_identity: IdentitySeed,
}

#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn call(&self, webhook: &PolicyPreWebhook, request: &WebhookRequest) -> Result<WebhookResponse, WebhookError>;
}
