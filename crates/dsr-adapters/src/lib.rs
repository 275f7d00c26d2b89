//! dsr-adapters: colaboradores concretos para el core.
//!
//! - `InMemoryBackend` + `InMemoryConnectorFactory`: backend tabular en
//!   memoria con fallos y latencias programables por colección.
//! - `ScriptedWebhookTransport`: respuestas de webhooks previos programadas
//!   por clave.

pub mod memory;
pub mod webhook;

pub use memory::{Fault, InMemoryBackend, InMemoryConnector, InMemoryConnectorFactory};
pub use webhook::ScriptedWebhookTransport;
