use loadcore::{ConfigError, ProtocolError};
use loadruntime::ClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Failed to start workflow {workflow_id}: {source}")]
    StartFailed {
        workflow_id: String,
        #[source]
        source: ClientError,
    },

    #[error("workflow execution failed (ID: {workflow_id}, run ID: {run_id}): {source}")]
    WorkflowFailed {
        workflow_id: String,
        run_id: String,
        #[source]
        source: ClientError,
    },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Unexpected result from workflow {workflow_id}: {detail}")]
    UnexpectedResult { workflow_id: String, detail: String },

    #[error("{failed} of {total} iterations failed, first failure: {first}")]
    IterationsFailed {
        failed: u64,
        total: u64,
        #[source]
        first: Box<ScenarioError>,
    },

    #[error("Iteration task panicked: {0}")]
    Panicked(String),

    #[error("Scenario cancelled")]
    Cancelled,
}

impl ScenarioError {
    /// Workflow id and run id the failure is attributed to, if any
    pub fn workflow(&self) -> Option<(&str, &str)> {
        match self {
            ScenarioError::WorkflowFailed {
                workflow_id,
                run_id,
                ..
            } => Some((workflow_id, run_id)),
            ScenarioError::StartFailed { workflow_id, .. }
            | ScenarioError::UnexpectedResult { workflow_id, .. } => Some((workflow_id, "")),
            ScenarioError::IterationsFailed { first, .. } => first.workflow(),
            _ => None,
        }
    }
}
