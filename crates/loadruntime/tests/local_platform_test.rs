// crates/loadruntime/tests/local_platform_test.rs

mod common;

use common::*;
use loadcore::kitchen_sink::WorkflowIdReusePolicy;
use loadcore::{Action, ActionSet, Payload, WorkflowInput, KITCHEN_SINK_WORKFLOW_TYPE};
use loadruntime::{ClientError, LocalPlatformConfig, WorkflowClient, WorkflowStatus};
use std::time::Duration;

fn returning(value: &str) -> Vec<Payload> {
    let input = WorkflowInput::new(vec![ActionSet::sequential(vec![Action::return_result(
        value.into(),
    )])]);
    vec![Payload::proto(&input)]
}

// ============================================================================
// Starting workflows
// ============================================================================

#[tokio::test]
async fn test_start_running_id_is_rejected() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);
    let _execution = start(&client, "dup", None).await;

    let second = client
        .start_workflow(options("dup"), KITCHEN_SINK_WORKFLOW_TYPE, Vec::new())
        .await;
    assert!(matches!(second, Err(ClientError::AlreadyStarted { .. })));

    client.terminate_workflow("dup", "", "test done").await.unwrap();
}

#[tokio::test]
async fn test_start_running_id_returns_existing_run_when_allowed() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);
    let first = start(&client, "dup-ok", None).await;

    let mut opts = options("dup-ok");
    opts.error_when_already_started = false;
    let second = client
        .start_workflow(opts, KITCHEN_SINK_WORKFLOW_TYPE, Vec::new())
        .await
        .unwrap();
    assert_eq!(first, second);

    client.terminate_workflow("dup-ok", "", "test done").await.unwrap();
}

#[tokio::test]
async fn test_reuse_policy_reject_duplicate_after_close() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let first = client
        .start_workflow(options("reuse"), KITCHEN_SINK_WORKFLOW_TYPE, returning("one"))
        .await
        .unwrap();
    client.get_result(&first).await.unwrap();

    let mut reject = options("reuse");
    reject.id_reuse_policy = WorkflowIdReusePolicy::RejectDuplicate;
    let rejected = client
        .start_workflow(reject, KITCHEN_SINK_WORKFLOW_TYPE, returning("two"))
        .await;
    assert!(matches!(rejected, Err(ClientError::AlreadyStarted { .. })));

    let again = client
        .start_workflow(options("reuse"), KITCHEN_SINK_WORKFLOW_TYPE, returning("three"))
        .await
        .unwrap();
    assert_ne!(again.run_id, first.run_id);
    assert_eq!(as_string(client.get_result(&again).await.unwrap()), "three");
}

#[tokio::test]
async fn test_terminate_if_running_replaces_run() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);
    let first = start(&client, "replace", None).await;

    let mut replace = options("replace");
    replace.id_reuse_policy = WorkflowIdReusePolicy::TerminateIfRunning;
    let second = client
        .start_workflow(replace, KITCHEN_SINK_WORKFLOW_TYPE, returning("replacement"))
        .await
        .unwrap();

    let old = client.get_result(&first).await;
    assert!(matches!(
        old,
        Err(ClientError::WorkflowFailed { status: WorkflowStatus::Terminated, .. })
    ));
    assert_eq!(as_string(client.get_result(&second).await.unwrap()), "replacement");
}

#[tokio::test]
async fn test_unknown_workflow_type_is_rejected() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let result = client
        .start_workflow(options("unknown-type"), "notAWorkflow", Vec::new())
        .await;
    assert!(matches!(result, Err(ClientError::UnknownWorkflowType(_))));
}

#[tokio::test]
async fn test_run_timeout_times_out_workflow() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let mut opts = options("timeout");
    opts.run_timeout = Some(Duration::from_millis(100));
    let execution = client
        .start_workflow(opts, KITCHEN_SINK_WORKFLOW_TYPE, Vec::new())
        .await
        .unwrap();

    let result = client.get_result(&execution).await;
    assert!(matches!(
        result,
        Err(ClientError::WorkflowFailed { status: WorkflowStatus::TimedOut, .. })
    ));
}

// ============================================================================
// Addressing runs
// ============================================================================

#[tokio::test]
async fn test_signal_to_closed_workflow_fails() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let execution = client
        .start_workflow(options("closed"), KITCHEN_SINK_WORKFLOW_TYPE, returning("done"))
        .await
        .unwrap();
    client.get_result(&execution).await.unwrap();

    let signal = client
        .signal_workflow("closed", "", loadcore::DO_ACTIONS_SIGNAL, Vec::new())
        .await;
    assert!(matches!(signal, Err(ClientError::AlreadyCompleted { .. })));
}

#[tokio::test]
async fn test_unknown_workflow_is_not_found() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let description = client.describe_workflow("nobody", "").await;
    assert!(matches!(description, Err(ClientError::NotFound { .. })));
}

#[tokio::test]
async fn test_unknown_query_is_reported() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);
    let _execution = start(&client, "query", None).await;

    let answer = client.query_workflow("query", "", "not_a_query").await;
    assert!(matches!(answer, Err(ClientError::UnknownQuery(_))));

    client.terminate_workflow("query", "", "test done").await.unwrap();
}

#[tokio::test]
async fn test_unknown_signal_name_is_dropped() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);
    let execution = start(&client, "unknown-signal", None).await;

    client
        .signal_workflow("unknown-signal", "", "not_a_signal", Vec::new())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let description = client.describe_workflow("unknown-signal", "").await.unwrap();
    assert_eq!(description.status, WorkflowStatus::Running);

    client.cancel_workflow("unknown-signal", "").await.unwrap();
    assert!(client.get_result(&execution).await.unwrap_err().is_canceled());
}

#[tokio::test]
async fn test_oldest_closed_runs_are_evicted() {
    init_tracing();
    let config = LocalPlatformConfig {
        retained_closed_runs: 2,
        ..Default::default()
    };
    let (_platform, client) = start_platform_with(config, vec![]);

    for workflow_id in ["evict-1", "evict-2", "evict-3"] {
        let execution = client
            .start_workflow(options(workflow_id), KITCHEN_SINK_WORKFLOW_TYPE, returning(workflow_id))
            .await
            .unwrap();
        client.get_result(&execution).await.unwrap();
    }
    // A running workflow is never evicted
    let _running = start(&client, "evict-running", None).await;

    // Eviction happens on the worker right after the close is published
    let mut evicted = false;
    for _ in 0..50 {
        if matches!(
            client.describe_workflow("evict-1", "").await,
            Err(ClientError::NotFound { .. })
        ) {
            evicted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(evicted, "oldest closed run should be forgotten");
    for workflow_id in ["evict-2", "evict-3"] {
        let description = client.describe_workflow(workflow_id, "").await.unwrap();
        assert_eq!(description.status, WorkflowStatus::Completed);
    }
    let running = client.describe_workflow("evict-running", "").await.unwrap();
    assert_eq!(running.status, WorkflowStatus::Running);

    client.terminate_workflow("evict-running", "", "test done").await.unwrap();
}
