//! Configuración de ejecución cargada desde variables de entorno.
//!
//! El archivo `.env` se carga perezosamente una sola vez. Valores ausentes o
//! no parseables caen en el default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

/// Lee `key` del entorno y la parsea; `default` si falta o es inválida.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    Lazy::force(&DOTENV_LOADED);
    env::var(key).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Qué hacer cuando un nodo termina en `error` tras agotar reintentos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Deja de planificar nodos nuevos; lo restante queda `skipped`.
    #[default]
    Strict,
    /// Sólo se omiten los dependientes del nodo fallido; las ramas
    /// independientes continúan.
    BestEffort,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "best_effort" | "best-effort" => Ok(Self::BestEffort),
            other => Err(format!("unknown execution mode '{other}'")),
        }
    }
}

/// Reintentos de llamadas a conectores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Intentos totales (incluido el primero). `0` se trata como `1`.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_factor: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, backoff_factor: u32) -> Self {
        Self { max_attempts,
               initial_backoff,
               backoff_factor }
    }

    /// Espera antes del intento `attempt + 1`, tras fallar el intento
    /// `attempt` (base 1): `initial * factor^(attempt - 1)`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let factor = self.backoff_factor.max(1).saturating_pow(exp);
        self.initial_backoff.saturating_mul(factor)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000), 2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    pub retry: RetryPolicy,
    /// Presupuesto por llamada a conector; excederlo es un fallo transitorio.
    pub connector_timeout: Duration,
    pub mode: ExecutionMode,
    /// Nodos listos ejecutados en paralelo como máximo.
    pub max_concurrent_tasks: usize,
    pub checkpoint_ttl: Duration,
    /// TTL de la identidad cacheada, incluida la derivada de webhooks.
    pub identity_ttl: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { retry: RetryPolicy::default(),
               connector_timeout: Duration::from_millis(30_000),
               mode: ExecutionMode::Strict,
               max_concurrent_tasks: 8,
               checkpoint_ttl: Duration::from_secs(604_800),
               identity_ttl: Duration::from_secs(604_800) }
    }
}

impl ExecutionConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let retry = RetryPolicy::new(env_or("DSR_TASK_RETRY_COUNT", d.retry.max_attempts),
                                     Duration::from_millis(env_or("DSR_TASK_RETRY_DELAY_MS", 1000u64)),
                                     env_or("DSR_TASK_RETRY_BACKOFF", d.retry.backoff_factor));
        Self { retry,
               connector_timeout: Duration::from_millis(env_or("DSR_CONNECTOR_TIMEOUT_MS", 30_000u64)),
               mode: env_or("DSR_EXECUTION_MODE", d.mode),
               max_concurrent_tasks: env_or("DSR_MAX_CONCURRENT_TASKS", d.max_concurrent_tasks).max(1),
               checkpoint_ttl: Duration::from_secs(env_or("DSR_CHECKPOINT_TTL_SECS", 604_800u64)),
               identity_ttl: Duration::from_secs(env_or("DSR_IDENTITY_TTL_SECS", 604_800u64)) }
    }

    /// Config con reintentos y timeouts cortos, útil para tests.
    pub fn with_retry(mut self, max_attempts: u32, initial_backoff: Duration) -> Self {
        self.retry = RetryPolicy::new(max_attempts, initial_backoff, self.retry.backoff_factor);
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_connector_timeout(mut self, timeout: Duration) -> Self {
        self.connector_timeout = timeout;
        self
    }

    pub fn with_identity_ttl(mut self, ttl: Duration) -> Self {
        self.identity_ttl = ttl;
        self
    }

    pub fn with_max_concurrent_tasks(mut self, limit: usize) -> Self {
        self.max_concurrent_tasks = limit.max(1);
        self
    }
}
