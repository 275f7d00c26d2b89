//! Reintentos, timeouts, modos strict/best-effort y cancelación.

mod common;

use std::time::Duration;

use common::*;
use dsr_adapters::Fault;
use dsr_core::{ActionType, CancelFlag, ConnectorError, ExecutionError, ExecutionMode, NodeStatus, Policy, PrivacyRequestStatus, Rule};

fn access_policy() -> Policy {
    Policy::new("access", vec![Rule::access("access_rule", &["user"])])
}

fn slow_twice() -> Vec<Fault> {
    vec![Fault::Delay(Duration::from_millis(250)), Fault::Delay(Duration::from_millis(250))]
}

#[tokio::test]
async fn two_timeouts_then_success_within_three_attempts() {
    let h = Harness::new();
    h.backend.push_query_faults(orders(), slow_twice());
    let request = h.approved_request(&access_policy(), &seed());
    let mut runner = h.runner(fast_config(3));

    let outcome = runner.execute(&request.id).await.expect("execute");

    assert_eq!(outcome.status, PrivacyRequestStatus::Complete);
    assert_eq!(outcome.node_statuses[&orders()], NodeStatus::Complete);
    assert_eq!(h.backend.query_calls(&orders()), 3);
    let retries = runner.execution_logs(&request.id)
                        .into_iter()
                        .filter(|e| e.address() == orders() && e.status == NodeStatus::Retrying)
                        .count();
    assert_eq!(retries, 2);
    let orders_log: Vec<NodeStatus> = runner.execution_logs(&request.id)
                                            .into_iter()
                                            .filter(|e| e.address() == orders() && e.action_type == ActionType::Access)
                                            .map(|e| e.status)
                                            .collect();
    assert_eq!(orders_log,
               vec![NodeStatus::Running, NodeStatus::Retrying, NodeStatus::Retrying, NodeStatus::Complete]);
}

#[tokio::test]
async fn two_timeouts_exhaust_a_bound_of_two() {
    let h = Harness::new();
    h.backend.push_query_faults(orders(), slow_twice());
    let request = h.approved_request(&access_policy(), &seed());
    let mut runner = h.runner(fast_config(2));

    let outcome = runner.execute(&request.id).await.expect("execute");

    assert_eq!(outcome.status, PrivacyRequestStatus::Error);
    assert_eq!(outcome.node_statuses[&orders()], NodeStatus::Error);
    assert_eq!(outcome.node_statuses[&items()], NodeStatus::Skipped);
    assert_eq!(outcome.failed_nodes, vec![orders()]);
    assert_eq!(h.backend.query_calls(&orders()), 2);
    assert_eq!(h.backend.query_calls(&items()), 0);
    let stored = h.stored(&request.id);
    assert_eq!(stored.status, PrivacyRequestStatus::Error);
    assert_eq!(stored.failure_reason.as_deref(), Some("1 node(s) failed: b:orders"));
}

#[tokio::test]
async fn permanent_errors_are_not_retried_and_strict_mode_stops() {
    let h = Harness::new();
    h.backend.push_query_faults(orders(), [Fault::Fail(ConnectorError::Auth("bad credentials".into()))]);
    let request = h.approved_request(&access_policy(), &seed());
    let mut runner = h.runner(fast_config(5));

    let outcome = runner.execute(&request.id).await.expect("execute");

    assert_eq!(h.backend.query_calls(&orders()), 1);
    // con un nodo a la vez: a:users, b:orders (falla) y c:profiles nunca empieza
    assert_eq!(outcome.node_statuses[&profiles()], NodeStatus::Skipped);
    assert_eq!(h.backend.query_calls(&profiles()), 0);
    assert_eq!(outcome.status, PrivacyRequestStatus::Error);
}

#[tokio::test]
async fn best_effort_keeps_independent_branches() {
    let h = Harness::new();
    h.backend.push_query_faults(orders(), [Fault::Fail(ConnectorError::Auth("bad credentials".into()))]);
    let request = h.approved_request(&access_policy(), &seed());
    let mut runner = h.runner(fast_config(3).with_mode(ExecutionMode::BestEffort));

    let outcome = runner.execute(&request.id).await.expect("execute");

    assert_eq!(outcome.status, PrivacyRequestStatus::Error);
    assert_eq!(outcome.node_statuses[&profiles()], NodeStatus::Complete);
    assert_eq!(outcome.node_statuses[&items()], NodeStatus::Skipped);
    assert_eq!(outcome.rows_for("access_rule", &profiles()).map(Vec::len), Some(1));
    let logs = runner.execution_logs(&request.id);
    assert!(logs.iter().any(|e| e.address() == users() && e.status == NodeStatus::Complete));
}

#[tokio::test]
async fn refused_connection_fails_its_nodes_only() {
    let h = Harness::new();
    h.factory.refuse("conn_c", ConnectorError::Auth("refused".into()));
    let request = h.approved_request(&access_policy(), &seed());
    let mut runner = h.runner(fast_config(3).with_mode(ExecutionMode::BestEffort));

    let outcome = runner.execute(&request.id).await.expect("execute");

    assert_eq!(outcome.node_statuses[&profiles()], NodeStatus::Error);
    assert_eq!(outcome.node_statuses[&items()], NodeStatus::Complete);
    assert_eq!(outcome.status, PrivacyRequestStatus::Error);
}

#[tokio::test]
async fn cancellation_skips_unscheduled_nodes() {
    let h = Harness::new();
    let request = h.approved_request(&access_policy(), &seed());
    let mut runner = h.runner(fast_config(3));
    let cancel = CancelFlag::new();
    cancel.cancel();

    let outcome = runner.execute_cancellable(&request.id, &cancel).await.expect("execute");

    assert_eq!(outcome.status, PrivacyRequestStatus::Error);
    assert_eq!(outcome.failure_reason.as_deref(), Some("cancelled"));
    assert!(outcome.node_statuses.values().all(|s| *s == NodeStatus::Skipped));
    assert_eq!(h.backend.total_query_calls(), 0);
    assert_eq!(h.factory.closed(), h.factory.opened());
    let skipped = runner.execution_logs(&request.id)
                        .into_iter()
                        .filter(|e| e.action_type == ActionType::Access && e.status == NodeStatus::Skipped)
                        .count();
    assert_eq!(skipped, 4);
}

#[tokio::test]
async fn panicking_connector_leaves_the_request_in_error() {
    let h = Harness::new();
    h.backend.push_query_faults(orders(), [Fault::Panic("driver bug".into())]);
    let request = h.approved_request(&access_policy(), &seed());
    let mut runner = h.runner(fast_config(1));

    let err = runner.execute(&request.id).await.unwrap_err();

    assert!(matches!(err, ExecutionError::Internal(_)));
    let stored = h.stored(&request.id);
    assert_eq!(stored.status, PrivacyRequestStatus::Error);
    assert!(stored.failure_reason.as_deref().unwrap_or_default().contains("driver bug"));
    assert!(stored.finished_processing_at.is_some());
    assert_eq!(h.factory.closed(), h.factory.opened());
    assert!(runner.execute(&request.id).await.is_err());
    assert_eq!(h.stored(&request.id).status, PrivacyRequestStatus::Error);
}
