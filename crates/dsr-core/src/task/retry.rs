//! Reintentos acotados con backoff exponencial y presupuesto de tiempo por
//! llamada. Un timeout cuenta como fallo transitorio.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::config::RetryPolicy;
use crate::errors::ConnectorError;

/// Ejecuta `op` hasta `policy.attempts()` veces. `on_retry` recibe el número
/// de intento fallido y el error antes de cada espera.
pub async fn with_retry<T, F, Fut, H>(policy: &RetryPolicy, timeout: Duration, mut op: F, mut on_retry: H) -> Result<T, ConnectorError>
    where F: FnMut() -> Fut,
          Fut: Future<Output = Result<T, ConnectorError>>,
          H: FnMut(u32, &ConnectorError)
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        let err = match tokio::time::timeout(timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => ConnectorError::Timeout(timeout.as_millis() as u64),
        };
        if !err.is_transient() || attempt >= attempts {
            return Err(err);
        }
        warn!("attempt {attempt}/{attempts} failed: {err}");
        on_retry(attempt, &err);
        tokio::time::sleep(policy.backoff_for(attempt)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max: u32) -> RetryPolicy {
        RetryPolicy::new(max, Duration::from_millis(1), 2)
    }

    async fn flaky(calls: &AtomicU32, failures: u32) -> Result<u32, ConnectorError> {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= failures {
            Err(ConnectorError::ConnectionReset("peer".into()))
        } else {
            Ok(n)
        }
    }

    #[tokio::test]
    async fn succeeds_within_bound() {
        let calls = AtomicU32::new(0);
        let mut retries = vec![];
        let res = with_retry(&policy(3), Duration::from_secs(1), || flaky(&calls, 2), |a, _| retries.push(a)).await;
        assert_eq!(res, Ok(3));
        assert_eq!(retries, vec![1, 2]);
    }

    #[test]
    fn gives_up_after_bound() {
        let calls = AtomicU32::new(0);
        let res = tokio_test::block_on(with_retry(&policy(2), Duration::from_secs(1), || flaky(&calls, 2), |_, _| {}));
        assert!(matches!(res, Err(ConnectorError::ConnectionReset(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = with_retry(&policy(5),
                                            Duration::from_secs(1),
                                            || {
                                                calls.fetch_add(1, Ordering::SeqCst);
                                                async { Err(ConnectorError::Auth("denied".into())) }
                                            },
                                            |_, _| {})
                                 .await;
        assert!(matches!(res, Err(ConnectorError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let res: Result<(), _> = with_retry(&policy(1),
                                            Duration::from_millis(5),
                                            || async {
                                                tokio::time::sleep(Duration::from_millis(200)).await;
                                                Ok(())
                                            },
                                            |_, _| {})
                                 .await;
        assert_eq!(res, Err(ConnectorError::Timeout(5)));
    }
}
