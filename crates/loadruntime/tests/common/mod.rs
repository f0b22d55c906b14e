// crates/loadruntime/tests/common/mod.rs

#![allow(dead_code)]

use async_trait::async_trait;
use loadcore::{
    Activity, ActivityContext, ActivityError, ActionSet, Payload, WorkflowInput,
    KITCHEN_SINK_WORKFLOW_TYPE,
};
use loadruntime::{
    ActivityRegistry, ClientError, LocalClient, LocalPlatform, LocalPlatformConfig,
    StartWorkflowOptions, WorkflowClient, WorkflowExecution,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Sleeps for a fixed time, counting starts and completions
pub struct CountingActivity {
    name: &'static str,
    delay: Duration,
    pub started: Arc<AtomicUsize>,
    pub finished: Arc<AtomicUsize>,
}

impl CountingActivity {
    pub fn new(name: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            delay,
            started: Arc::new(AtomicUsize::new(0)),
            finished: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Activity for CountingActivity {
    fn activity_type(&self) -> &str {
        self.name
    }

    async fn execute(&self, ctx: ActivityContext) -> Result<Option<Payload>, ActivityError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            _ = ctx.cancellation.cancelled() => Err(ActivityError::Cancelled),
            _ = tokio::time::sleep(self.delay) => {
                self.finished.fetch_add(1, Ordering::SeqCst);
                Ok(Some(Payload::from("done")))
            }
        }
    }
}

/// Fails every attempt with the configured error type
pub struct FailingActivity {
    pub attempts: Arc<AtomicUsize>,
    error_type: &'static str,
}

impl FailingActivity {
    pub fn new(error_type: &'static str) -> Arc<Self> {
        Arc::new(Self {
            attempts: Arc::new(AtomicUsize::new(0)),
            error_type,
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Activity for FailingActivity {
    fn activity_type(&self) -> &str {
        "fail"
    }

    async fn execute(&self, ctx: ActivityContext) -> Result<Option<Payload>, ActivityError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ActivityError::failed(
            self.error_type,
            format!("attempt {} failed", ctx.attempt),
        ))
    }
}

pub fn start_platform(activities: Vec<Arc<dyn Activity>>) -> (LocalPlatform, LocalClient) {
    start_platform_with(LocalPlatformConfig::default(), activities)
}

pub fn start_platform_with(
    config: LocalPlatformConfig,
    activities: Vec<Arc<dyn Activity>>,
) -> (LocalPlatform, LocalClient) {
    let mut registry = ActivityRegistry::new();
    for activity in activities {
        registry.register(activity);
    }
    let platform = LocalPlatform::start(config, registry).expect("platform should start");
    let client = platform.client();
    (platform, client)
}

pub fn options(workflow_id: &str) -> StartWorkflowOptions {
    StartWorkflowOptions {
        id: workflow_id.to_string(),
        task_queue: "tests".to_string(),
        error_when_already_started: true,
        ..Default::default()
    }
}

pub async fn start(
    client: &LocalClient,
    workflow_id: &str,
    input: Option<WorkflowInput>,
) -> WorkflowExecution {
    let args = match input {
        Some(input) => vec![Payload::proto(&input)],
        None => Vec::new(),
    };
    client
        .start_workflow(options(workflow_id), KITCHEN_SINK_WORKFLOW_TYPE, args)
        .await
        .expect("workflow should start")
}

/// Start a workflow running `sets` as its initial actions and wait for it
pub async fn run_sets(
    client: &LocalClient,
    workflow_id: &str,
    sets: Vec<ActionSet>,
) -> Result<Option<Payload>, ClientError> {
    let execution = start(client, workflow_id, Some(WorkflowInput::new(sets))).await;
    client.get_result(&execution).await
}

pub fn as_string(result: Option<Payload>) -> String {
    result
        .expect("workflow should return a value")
        .to_json::<String>()
        .expect("result should be a JSON string")
}
