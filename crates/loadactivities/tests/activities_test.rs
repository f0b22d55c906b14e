// crates/loadactivities/tests/activities_test.rs

use loadactivities::{register_all, DelayActivity, EchoActivity, NoopActivity};
use loadcore::{Activity, ActivityContext, ActivityError, Payload};
use loadruntime::ActivityRegistry;
use std::time::{Duration, Instant};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

// Helper function to create a test context
fn create_test_context(activity_type: &str, args: Vec<Payload>) -> ActivityContext {
    ActivityContext::new(activity_type, args)
}

#[tokio::test]
async fn test_noop_returns_nothing() {
    init_tracing();
    let result = NoopActivity
        .execute(create_test_context("noop", vec![]))
        .await;

    assert_eq!(result, Ok(None));
}

#[tokio::test]
async fn test_echo_returns_input() {
    init_tracing();
    let result = EchoActivity
        .execute(create_test_context("echo", vec![Payload::from("hello")]))
        .await
        .expect("echo should succeed")
        .expect("echo should return a payload");

    assert_eq!(result.to_json::<String>().unwrap(), "hello");
}

#[tokio::test]
async fn test_echo_requires_argument() {
    init_tracing();
    let result = EchoActivity
        .execute(create_test_context("echo", vec![]))
        .await;

    assert_eq!(result, Err(ActivityError::MissingArgument(0)));
}

#[tokio::test]
async fn test_delay_sleeps_for_requested_time() {
    init_tracing();
    let args = vec![Payload::json(&50u64).unwrap()];

    let started = Instant::now();
    let result = DelayActivity
        .execute(create_test_context("delay", args))
        .await;

    assert_eq!(result, Ok(None));
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn test_delay_stops_when_cancelled() {
    init_tracing();
    let ctx = create_test_context("delay", vec![Payload::json(&60_000u64).unwrap()]);
    let cancellation = ctx.cancellation.clone();

    let handle = tokio::spawn(async move { DelayActivity.execute(ctx).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancellation.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("delay should stop promptly")
        .expect("task should not panic");
    assert_eq!(result, Err(ActivityError::Cancelled));
}

#[tokio::test]
async fn test_delay_rejects_non_numeric_argument() {
    init_tracing();
    let result = DelayActivity
        .execute(create_test_context("delay", vec![Payload::from("soon")]))
        .await;

    assert!(matches!(
        result,
        Err(ActivityError::InvalidArgument { index: 0, .. })
    ));
}

#[test]
fn test_register_all_registers_standard_activities() {
    let mut registry = ActivityRegistry::new();
    register_all(&mut registry);

    assert_eq!(
        registry.list_activity_types(),
        vec!["delay".to_string(), "echo".to_string(), "noop".to_string()]
    );
    let metadata = registry.get_metadata("delay").expect("delay should have metadata");
    assert_eq!(metadata.arguments.len(), 1);
    assert!(registry.get("echo").is_some());
}
