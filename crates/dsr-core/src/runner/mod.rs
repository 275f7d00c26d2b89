//! Runner de solicitudes: webhooks previos, recorrido de acceso concurrente,
//! borrado y transición final de la solicitud.

pub mod core;
pub mod outcome;
pub mod webhook;

pub use self::core::PrivacyRequestRunner;
pub use outcome::ExecutionOutcome;
pub use webhook::{WebhookRequest, WebhookResponse, WebhookTransport};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Señal de cancelación compartida con el caller. Una vez levantada no se
/// programan más nodos.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
