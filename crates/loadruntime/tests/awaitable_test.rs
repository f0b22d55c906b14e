// crates/loadruntime/tests/awaitable_test.rs

mod common;

use common::*;
use loadcore::kitchen_sink::{
    ActivityCancellationType, ExecuteActivityAction, ExecuteChildWorkflowAction,
    ParentClosePolicy, RetryPolicy, SendSignalAction,
};
use loadcore::{duration, Action, ActionSet, Choice, DoSignalActions, WorkflowInput};
use loadruntime::{ClientError, WorkflowClient, WorkflowStatus};
use std::time::{Duration, Instant};

fn slow(choice: Choice) -> Action {
    Action::activity(ExecuteActivityAction::new("slow").with_choice(choice))
}

async fn wait_for_status(
    client: &loadruntime::LocalClient,
    workflow_id: &str,
    status: WorkflowStatus,
) -> bool {
    for _ in 0..50 {
        if let Ok(description) = client.describe_workflow(workflow_id, "").await {
            if description.status == status {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

// ============================================================================
// Activities
// ============================================================================

#[tokio::test]
async fn test_wait_finish_waits_for_activity() {
    init_tracing();
    let activity = CountingActivity::new("slow", Duration::from_millis(100));
    let (_platform, client) = start_platform(vec![activity.clone()]);

    let started = Instant::now();
    let result = run_sets(
        &client,
        "wait-finish",
        vec![ActionSet::sequential(vec![slow(Choice::WaitFinish)])],
    )
    .await;

    assert!(result.is_ok());
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(activity.finished(), 1);
}

#[tokio::test]
async fn test_cancel_before_started_never_runs_activity() {
    init_tracing();
    let activity = CountingActivity::new("slow", Duration::from_millis(50));
    let (_platform, client) = start_platform(vec![activity.clone()]);

    let result = run_sets(
        &client,
        "cancel-before",
        vec![ActionSet::sequential(vec![
            slow(Choice::CancelBeforeStarted),
            Action::timer(100, Choice::WaitFinish),
            Action::return_result("ok".into()),
        ])],
    )
    .await;

    assert_eq!(as_string(result.unwrap()), "ok");
    assert_eq!(activity.started(), 0, "activity must never start");
}

#[tokio::test]
async fn test_cancel_after_started_stops_activity() {
    init_tracing();
    let activity = CountingActivity::new("slow", Duration::from_secs(10));
    let (_platform, client) = start_platform(vec![activity.clone()]);

    let started = Instant::now();
    let result = run_sets(
        &client,
        "cancel-after-started",
        vec![ActionSet::sequential(vec![
            slow(Choice::CancelAfterStarted),
            Action::return_result("ok".into()),
        ])],
    )
    .await;

    assert_eq!(as_string(result.unwrap()), "ok");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(activity.finished(), 0);
}

#[tokio::test]
async fn test_cancel_after_completed_lets_activity_finish() {
    init_tracing();
    let activity = CountingActivity::new("slow", Duration::from_millis(50));
    let (_platform, client) = start_platform(vec![activity.clone()]);

    let result = run_sets(
        &client,
        "cancel-after-completed",
        vec![ActionSet::sequential(vec![slow(Choice::CancelAfterCompleted)])],
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(activity.finished(), 1);
}

#[tokio::test]
async fn test_abandon_returns_immediately_and_work_continues() {
    init_tracing();
    let activity = CountingActivity::new("slow", Duration::from_millis(300));
    let (_platform, client) = start_platform(vec![activity.clone()]);

    let started = Instant::now();
    let result = run_sets(
        &client,
        "abandon",
        vec![ActionSet::sequential(vec![
            slow(Choice::Abandon),
            Action::return_result("ok".into()),
        ])],
    )
    .await;

    assert_eq!(as_string(result.unwrap()), "ok");
    assert!(started.elapsed() < Duration::from_millis(300));

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(activity.finished(), 1, "abandoned work keeps running");
}

#[tokio::test]
async fn test_wait_cancellation_completed_waits_for_activity() {
    init_tracing();
    let activity = CountingActivity::new("slow", Duration::from_secs(10));
    let (_platform, client) = start_platform(vec![activity.clone()]);

    let action = Action::activity(
        ExecuteActivityAction::new("slow")
            .with_cancellation_type(ActivityCancellationType::WaitCancellationCompleted)
            .with_choice(Choice::CancelAfterStarted),
    );
    let result = run_sets(
        &client,
        "wait-cancellation",
        vec![ActionSet::sequential(vec![action])],
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(activity.finished(), 0);
}

#[tokio::test]
async fn test_activity_retries_until_attempts_exhausted() {
    init_tracing();
    let activity = FailingActivity::new("Flaky");
    let (_platform, client) = start_platform(vec![activity.clone()]);

    let policy = RetryPolicy {
        initial_interval: Some(duration::from_millis(10)),
        maximum_attempts: 3,
        ..Default::default()
    };
    let result = run_sets(
        &client,
        "retries",
        vec![ActionSet::sequential(vec![Action::activity(
            ExecuteActivityAction::new("fail").with_retry_policy(policy),
        )])],
    )
    .await;

    assert!(matches!(result, Err(ClientError::WorkflowFailed { status: WorkflowStatus::Failed, .. })));
    assert_eq!(activity.attempts(), 3);
}

#[tokio::test]
async fn test_non_retryable_error_type_stops_retries() {
    init_tracing();
    let activity = FailingActivity::new("Fatal");
    let (_platform, client) = start_platform(vec![activity.clone()]);

    let policy = RetryPolicy {
        initial_interval: Some(duration::from_millis(10)),
        non_retryable_error_types: vec!["Fatal".to_string()],
        ..Default::default()
    };
    let result = run_sets(
        &client,
        "non-retryable",
        vec![ActionSet::sequential(vec![Action::activity(
            ExecuteActivityAction::new("fail").with_retry_policy(policy),
        )])],
    )
    .await;

    assert!(result.is_err());
    assert_eq!(activity.attempts(), 1);
}

#[tokio::test]
async fn test_start_to_close_timeout_fails_attempt() {
    init_tracing();
    let activity = CountingActivity::new("slow", Duration::from_secs(10));
    let (_platform, client) = start_platform(vec![activity.clone()]);

    let policy = RetryPolicy {
        maximum_attempts: 1,
        ..Default::default()
    };
    let result = run_sets(
        &client,
        "start-to-close",
        vec![ActionSet::sequential(vec![Action::activity(
            ExecuteActivityAction::new("slow")
                .with_start_to_close(Duration::from_millis(100))
                .with_retry_policy(policy),
        )])],
    )
    .await;

    match result {
        Err(ClientError::WorkflowFailed { message, .. }) => {
            assert!(message.contains("start-to-close"), "unexpected message: {}", message);
        }
        other => panic!("Expected timeout failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_activity_type_fails_workflow() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let result = run_sets(
        &client,
        "unknown-activity",
        vec![ActionSet::sequential(vec![Action::activity(ExecuteActivityAction::new("missing"))])],
    )
    .await;

    match result {
        Err(ClientError::WorkflowFailed { message, .. }) => {
            assert!(message.contains("missing"), "unexpected message: {}", message);
        }
        other => panic!("Expected failure, got {:?}", other),
    }
}

// ============================================================================
// Timers
// ============================================================================

#[tokio::test]
async fn test_timer_cancel_choices_return_without_waiting() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    for (workflow_id, choice) in [
        ("timer-cancel-before", Choice::CancelBeforeStarted),
        ("timer-cancel-after-started", Choice::CancelAfterStarted),
        ("timer-abandon", Choice::Abandon),
    ] {
        let started = Instant::now();
        let result = run_sets(
            &client,
            workflow_id,
            vec![ActionSet::sequential(vec![
                Action::timer(5_000, choice),
                Action::return_result("ok".into()),
            ])],
        )
        .await;

        assert_eq!(as_string(result.unwrap()), "ok");
        assert!(
            started.elapsed() < Duration::from_secs(3),
            "{:?} must not wait for the timer",
            choice
        );
    }
}

#[tokio::test]
async fn test_timer_cancel_after_completed_waits_for_timer() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let started = Instant::now();
    let result = run_sets(
        &client,
        "timer-cancel-after-completed",
        vec![ActionSet::sequential(vec![Action::timer(100, Choice::CancelAfterCompleted)])],
    )
    .await;

    assert_eq!(result.unwrap(), None);
    assert!(started.elapsed() >= Duration::from_millis(100));
}

// ============================================================================
// Signals to other workflows
// ============================================================================

fn finish_signal(target: &str, choice: Choice) -> Action {
    Action::send_signal(SendSignalAction::do_actions(
        target,
        DoSignalActions::in_main(ActionSet::sequential(vec![Action::return_result(
            "signalled".into(),
        )])),
        choice,
    ))
}

#[tokio::test]
async fn test_signal_cancel_before_started_is_never_delivered() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);
    let target = start(&client, "signal-never", None).await;

    let sender = run_sets(
        &client,
        "signal-never-sender",
        vec![ActionSet::sequential(vec![
            finish_signal("signal-never", Choice::CancelBeforeStarted),
            Action::return_result("sent".into()),
        ])],
    )
    .await;
    assert_eq!(as_string(sender.unwrap()), "sent");

    let waited = tokio::time::timeout(Duration::from_millis(300), client.get_result(&target)).await;
    assert!(waited.is_err(), "target must not receive the signal");

    client.terminate_workflow("signal-never", "", "test done").await.unwrap();
}

#[tokio::test]
async fn test_abandoned_signal_is_still_delivered() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);
    let target = start(&client, "signal-abandoned", None).await;

    let sender = run_sets(
        &client,
        "signal-abandoned-sender",
        vec![ActionSet::sequential(vec![
            finish_signal("signal-abandoned", Choice::Abandon),
            Action::timer(50, Choice::WaitFinish),
        ])],
    )
    .await;
    assert!(sender.is_ok());

    let result = tokio::time::timeout(Duration::from_secs(5), client.get_result(&target))
        .await
        .expect("target should finish");
    assert_eq!(as_string(result.unwrap()), "signalled");
}

// ============================================================================
// Child workflows
// ============================================================================

fn child(workflow_id: &str, input: &WorkflowInput, choice: Choice) -> Action {
    Action::child_workflow(ExecuteChildWorkflowAction::kitchen_sink(workflow_id, input).with_choice(choice))
}

#[tokio::test]
async fn test_child_wait_finish_waits_for_child() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let input = WorkflowInput::new(vec![ActionSet::sequential(vec![
        Action::timer(100, Choice::WaitFinish),
        Action::return_result("child done".into()),
    ])]);
    let started = Instant::now();
    let result = run_sets(
        &client,
        "parent-wait",
        vec![ActionSet::sequential(vec![child("child-wait", &input, Choice::WaitFinish)])],
    )
    .await;

    assert!(result.is_ok());
    assert!(started.elapsed() >= Duration::from_millis(100));
    let description = client.describe_workflow("child-wait", "").await.unwrap();
    assert_eq!(description.status, WorkflowStatus::Completed);
}

#[tokio::test]
async fn test_child_failure_fails_parent() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let input = WorkflowInput::new(vec![ActionSet::sequential(vec![Action::return_error("child broke")])]);
    let result = run_sets(
        &client,
        "parent-of-failure",
        vec![ActionSet::sequential(vec![child("child-failure", &input, Choice::WaitFinish)])],
    )
    .await;

    match result {
        Err(ClientError::WorkflowFailed { message, .. }) => {
            assert!(message.contains("child broke"), "unexpected message: {}", message);
        }
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_child_cancel_after_started_cancels_child() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    // No initial actions: the child waits for signals forever
    let input = WorkflowInput::default();
    let result = run_sets(
        &client,
        "parent-cancel",
        vec![ActionSet::sequential(vec![
            child("child-cancel", &input, Choice::CancelAfterStarted),
            Action::return_result("parent done".into()),
        ])],
    )
    .await;

    assert_eq!(as_string(result.unwrap()), "parent done");
    assert!(wait_for_status(&client, "child-cancel", WorkflowStatus::Canceled).await);
}

#[tokio::test]
async fn test_parent_close_policy_abandon_leaves_child_running() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let input = WorkflowInput::default();
    let action = Action::child_workflow(
        ExecuteChildWorkflowAction::kitchen_sink("child-abandoned", &input)
            .with_choice(Choice::Abandon)
            .with_parent_close_policy(ParentClosePolicy::Abandon),
    );
    let result = run_sets(&client, "parent-abandon", vec![ActionSet::sequential(vec![action])]).await;
    assert!(result.is_ok());

    tokio::time::sleep(Duration::from_millis(200)).await;
    let description = client.describe_workflow("child-abandoned", "").await.unwrap();
    assert_eq!(description.status, WorkflowStatus::Running);

    client
        .terminate_workflow("child-abandoned", "", "test done")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_parent_close_policy_terminate_stops_child() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let input = WorkflowInput::default();
    let action = Action::child_workflow(
        ExecuteChildWorkflowAction::kitchen_sink("child-terminated", &input)
            .with_choice(Choice::Abandon)
            .with_parent_close_policy(ParentClosePolicy::Terminate),
    );
    let result = run_sets(
        &client,
        "parent-terminate",
        vec![ActionSet::sequential(vec![
            action,
            Action::timer(50, Choice::WaitFinish),
        ])],
    )
    .await;
    assert!(result.is_ok());

    assert!(wait_for_status(&client, "child-terminated", WorkflowStatus::Terminated).await);
}

#[tokio::test]
async fn test_child_cancel_before_started_never_starts_child() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let input = WorkflowInput::default();
    let result = run_sets(
        &client,
        "parent-cancel-before",
        vec![ActionSet::sequential(vec![
            child("child-never", &input, Choice::CancelBeforeStarted),
            Action::return_result("ok".into()),
        ])],
    )
    .await;

    assert_eq!(as_string(result.unwrap()), "ok");
    assert!(matches!(
        client.describe_workflow("child-never", "").await,
        Err(ClientError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_child_cancel_after_completed_propagates_failure() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let input = WorkflowInput::new(vec![ActionSet::sequential(vec![Action::return_error("late failure")])]);
    let result = run_sets(
        &client,
        "parent-cancel-after-completed",
        vec![ActionSet::sequential(vec![
            child("child-late-failure", &input, Choice::CancelAfterCompleted),
            Action::return_result("unreachable".into()),
        ])],
    )
    .await;

    match result {
        Err(ClientError::WorkflowFailed { message, .. }) => {
            assert!(message.contains("late failure"), "unexpected message: {}", message);
        }
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_child_abandon_returns_before_child_finishes() {
    init_tracing();
    let (_platform, client) = start_platform(vec![]);

    let input = WorkflowInput::new(vec![ActionSet::sequential(vec![
        Action::timer(300, Choice::WaitFinish),
        Action::return_result("child done".into()),
    ])]);
    let action = Action::child_workflow(
        ExecuteChildWorkflowAction::kitchen_sink("child-left-behind", &input)
            .with_choice(Choice::Abandon)
            .with_parent_close_policy(ParentClosePolicy::Abandon),
    );

    let started = Instant::now();
    let result = run_sets(
        &client,
        "parent-leaves",
        vec![ActionSet::sequential(vec![action, Action::return_result("parent done".into())])],
    )
    .await;

    assert_eq!(as_string(result.unwrap()), "parent done");
    assert!(started.elapsed() < Duration::from_millis(300));
    assert!(wait_for_status(&client, "child-left-behind", WorkflowStatus::Completed).await);
}
