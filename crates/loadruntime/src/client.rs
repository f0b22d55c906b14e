use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loadcore::kitchen_sink::WorkflowIdReusePolicy;
use loadcore::Payload;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Address of one run of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkflowExecution {
    pub workflow_id: String,
    pub run_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct StartWorkflowOptions {
    pub id: String,
    pub task_queue: String,
    pub id_reuse_policy: WorkflowIdReusePolicy,
    /// When false, starting an id that is already running returns the
    /// running execution instead of an error.
    pub error_when_already_started: bool,
    pub run_timeout: Option<Duration>,
    pub search_attributes: HashMap<String, Payload>,
    pub memo: HashMap<String, Payload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    Canceled,
    Terminated,
    TimedOut,
    ContinuedAsNew,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowStatus::Running => "running",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Canceled => "canceled",
            WorkflowStatus::Terminated => "terminated",
            WorkflowStatus::TimedOut => "timed out",
            WorkflowStatus::ContinuedAsNew => "continued as new",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowDescription {
    pub execution: WorkflowExecution,
    pub workflow_type: String,
    pub task_queue: String,
    pub status: WorkflowStatus,
    pub start_time: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
    pub search_attributes: HashMap<String, Payload>,
    pub memo: HashMap<String, Payload>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Workflow execution already started: {workflow_id}")]
    AlreadyStarted { workflow_id: String },

    #[error("Workflow execution not found: {workflow_id}")]
    NotFound { workflow_id: String },

    #[error("Workflow execution already completed: {workflow_id}")]
    AlreadyCompleted { workflow_id: String },

    #[error("Unknown workflow type: {0}")]
    UnknownWorkflowType(String),

    #[error("Workflow {status}: {message}")]
    WorkflowFailed {
        status: WorkflowStatus,
        message: String,
    },

    #[error("Update rejected: {0}")]
    UpdateRejected(String),

    #[error("Update failed: {0}")]
    UpdateFailed(String),

    #[error("Unknown update: {0}")]
    UnknownUpdate(String),

    #[error("Unknown query: {0}")]
    UnknownQuery(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl ClientError {
    /// The workflow ended in cancellation rather than failure.
    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            ClientError::WorkflowFailed {
                status: WorkflowStatus::Canceled,
                ..
            }
        )
    }
}

/// The operations the harness needs from the orchestration service.
///
/// An empty `run_id` addresses the latest run of `workflow_id`.
#[async_trait]
pub trait WorkflowClient: Send + Sync {
    fn namespace(&self) -> &str;

    async fn start_workflow(
        &self,
        options: StartWorkflowOptions,
        workflow_type: &str,
        args: Vec<Payload>,
    ) -> Result<WorkflowExecution, ClientError>;

    /// Wait for the run to close, following continue-as-new to the last run.
    async fn get_result(&self, execution: &WorkflowExecution)
        -> Result<Option<Payload>, ClientError>;

    async fn signal_workflow(
        &self,
        workflow_id: &str,
        run_id: &str,
        signal_name: &str,
        args: Vec<Payload>,
    ) -> Result<(), ClientError>;

    async fn update_workflow(
        &self,
        workflow_id: &str,
        run_id: &str,
        update_name: &str,
        args: Vec<Payload>,
    ) -> Result<Payload, ClientError>;

    async fn query_workflow(
        &self,
        workflow_id: &str,
        run_id: &str,
        query_type: &str,
    ) -> Result<Payload, ClientError>;

    async fn cancel_workflow(&self, workflow_id: &str, run_id: &str) -> Result<(), ClientError>;

    async fn terminate_workflow(
        &self,
        workflow_id: &str,
        run_id: &str,
        reason: &str,
    ) -> Result<(), ClientError>;

    async fn describe_workflow(
        &self,
        workflow_id: &str,
        run_id: &str,
    ) -> Result<WorkflowDescription, ClientError>;
}
