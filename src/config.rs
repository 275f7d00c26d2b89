//! Configuración central de la aplicación.
//! Combina la `ExecutionConfig` del motor con los ajustes del servicio de
//! solicitudes y expone una instancia inmutable (`CONFIG`) leída del entorno
//! (.env incluido) una sola vez.
use std::time::Duration;

use dsr_core::config::{env_or, init_dotenv};
use dsr_core::ExecutionConfig;
use once_cell::sync::Lazy;

const DEFAULT_TTL_SECS: u64 = 604_800;

/// Configuración global de la aplicación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Reintentos, timeouts, modo de ejecución y TTL de identidad del runner.
    pub execution: ExecutionConfig,
    /// Si es `false`, las solicitudes creadas se aprueban y ejecutan al
    /// momento.
    pub require_manual_request_approval: bool,
    pub masking_secret_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { execution: ExecutionConfig::default(),
               require_manual_request_approval: false,
               masking_secret_ttl: Duration::from_secs(DEFAULT_TTL_SECS) }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        init_dotenv();
        Self { execution: ExecutionConfig::from_env(),
               require_manual_request_approval: env_or("DSR_REQUIRE_MANUAL_REQUEST_APPROVAL", false),
               masking_secret_ttl: Duration::from_secs(env_or("DSR_MASKING_SECRET_TTL_SECS", DEFAULT_TTL_SECS)) }
    }

    pub fn with_manual_approval(mut self, required: bool) -> Self {
        self.require_manual_request_approval = required;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_approval_flag_is_read_from_env() {
        std::env::set_var("DSR_REQUIRE_MANUAL_REQUEST_APPROVAL", "true");
        std::env::set_var("DSR_IDENTITY_TTL_SECS", "60");
        let cfg = AppConfig::from_env();
        assert!(cfg.require_manual_request_approval);
        assert_eq!(cfg.execution.identity_ttl, Duration::from_secs(60));
        assert_eq!(cfg.masking_secret_ttl, Duration::from_secs(DEFAULT_TTL_SECS));
    }

    #[test]
    fn defaults_execute_without_approval() {
        let cfg = AppConfig::default();
        assert!(!cfg.require_manual_request_approval);
        assert_eq!(cfg.execution, ExecutionConfig::default());
    }
}
