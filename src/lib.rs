//! dsrflow
//!
//! Fachada de aplicación sobre `dsr-core`:
//! - `config` lee la configuración del entorno (`CONFIG`).
//! - `errors` agrupa los errores del servicio.
//! - `service` expone las operaciones en lote sobre solicitudes de privacidad.

pub mod config;
pub mod errors;
pub mod service;

pub use config::{AppConfig, CONFIG};
pub use errors::ServiceError;
pub use service::{BulkResponse, PrivacyRequestCreate, PrivacyRequestService};
