//! Escenarios de acceso sobre la fixture a/b/c.

mod common;

use common::*;
use dsr_core::{ActionType, ExecutionError, IdentitySeed, NodeStatus, Policy, PrivacyRequestStatus, Rule};
use serde_json::json;

fn access_policy(categories: &[&str]) -> Policy {
    Policy::new("access", vec![Rule::access("access_rule", categories)])
}

#[tokio::test]
async fn dependents_run_after_producers_with_propagated_values() {
    let h = Harness::new();
    let request = h.approved_request(&access_policy(&["user"]), &seed());
    let mut runner = h.runner(fast_config(3));

    let outcome = runner.execute(&request.id).await.expect("execute");

    assert_eq!(outcome.status, PrivacyRequestStatus::Complete);
    assert_eq!(h.stored(&request.id).status, PrivacyRequestStatus::Complete);
    assert!(outcome.node_statuses.values().all(|s| *s == NodeStatus::Complete));

    let user_rows = outcome.rows_for("access_rule", &users()).expect("users");
    assert_eq!(user_rows, &vec![row(json!({"email": "jane@example.com"}))]);
    let order_rows = outcome.rows_for("access_rule", &orders()).expect("orders");
    assert_eq!(order_rows.len(), 2);
    let item_rows = outcome.rows_for("access_rule", &items()).expect("items");
    assert_eq!(item_rows, &vec![row(json!({"note": "leave at door"}))]);

    let logs = runner.execution_logs(&request.id);
    let position = |addr: &dsr_core::CollectionAddress, status: NodeStatus| {
        logs.iter()
            .position(|e| &e.address() == addr && e.status == status && e.action_type == ActionType::Access)
            .expect("log entry")
    };
    assert!(position(&users(), NodeStatus::Complete) < position(&orders(), NodeStatus::Running));
    assert!(position(&orders(), NodeStatus::Complete) < position(&items(), NodeStatus::Running));
}

#[tokio::test]
async fn access_results_only_contain_matching_categories() {
    let h = Harness::new();
    let request = h.approved_request(&access_policy(&["user.contact.email"]), &seed());
    let mut runner = h.runner(fast_config(3));

    let outcome = runner.execute(&request.id).await.expect("execute");
    let results = &outcome.access_results["access_rule"];

    assert_eq!(results.keys().cloned().collect::<Vec<_>>(), vec![users(), profiles()]);
    assert_eq!(results[&profiles()], vec![row(json!({"email": "jane@example.com"}))]);
}

#[tokio::test]
async fn missing_identity_makes_request_error_without_queries() {
    let h = Harness::new();
    let identity = IdentitySeed::from([("user_id".to_string(), json!("u1"))]);
    let request = h.approved_request(&access_policy(&["user"]), &identity);
    let mut runner = h.runner(fast_config(3));

    let outcome = runner.execute(&request.id).await.expect("execute");

    assert_eq!(outcome.status, PrivacyRequestStatus::Error);
    assert_eq!(outcome.failure_reason.as_deref(), Some("Some nodes were not reachable: c:profiles"));
    assert_eq!(h.backend.total_query_calls(), 0);
    assert_eq!(h.factory.opened(), 0);
}

#[tokio::test]
async fn connectors_are_released_after_execution() {
    let h = Harness::new();
    let request = h.approved_request(&access_policy(&["user"]), &seed());
    let mut runner = h.runner(fast_config(3));

    runner.execute(&request.id).await.expect("execute");

    assert_eq!(h.factory.opened(), 3);
    assert_eq!(h.factory.closed(), 3);
}

#[tokio::test]
async fn only_approved_requests_execute() {
    let h = Harness::new();
    let policy = access_policy(&["user"]);
    let request = h.approved_request(&policy, &seed());
    let mut runner = h.runner(fast_config(3));
    runner.execute(&request.id).await.expect("first run");

    let err = runner.execute(&request.id).await.unwrap_err();
    assert!(matches!(err, ExecutionError::State(_)));
    assert!(matches!(runner.execute("pri_unknown").await, Err(ExecutionError::RequestNotFound(_))));
    assert_eq!(h.stored(&request.id).status, PrivacyRequestStatus::Complete);
}

#[tokio::test]
async fn concurrent_branches_reach_the_same_result() {
    let h = Harness::new();
    let request = h.approved_request(&access_policy(&["user"]), &seed());
    let mut runner = h.runner(fast_config(3).with_max_concurrent_tasks(8));

    let outcome = runner.execute(&request.id).await.expect("execute");

    assert_eq!(outcome.status, PrivacyRequestStatus::Complete);
    assert_eq!(outcome.rows_for("access_rule", &orders()).map(Vec::len), Some(2));
}

#[test]
fn dry_run_is_idempotent_and_value_free() {
    let h = Harness::new();
    let runner = h.runner(fast_config(3));

    let first = runner.dry_run(&[]).expect("dry run");
    let second = runner.dry_run(&[]).expect("dry run");

    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
    assert_eq!(first[&orders()], "SELECT address,id,user_id FROM orders WHERE user_id = ?");
    assert_eq!(first[&items()], "SELECT note,order_id FROM order_items WHERE order_id = ?");
    assert_eq!(h.backend.total_query_calls(), 0);
}

#[test]
fn dry_run_rejects_unknown_or_incomplete_dataset_selection() {
    let h = Harness::new();
    let runner = h.runner(fast_config(3));

    assert!(matches!(runner.dry_run(&["nope".to_string()]), Err(ExecutionError::Repository(_))));
    assert!(matches!(runner.dry_run(&["b".to_string()]), Err(ExecutionError::Validation(_))));
    let only_c = runner.dry_run(&["c".to_string()]).expect("dry run");
    assert_eq!(only_c[&profiles()], "SELECT email,id,name FROM profiles WHERE email = ?");
}
