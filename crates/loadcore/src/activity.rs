use crate::{ActivityError, Payload};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// Core trait that all activities implement
#[async_trait]
pub trait Activity: Send + Sync {
    /// Name the workflow schedules this activity by (e.g. "echo", "delay")
    fn activity_type(&self) -> &str;

    /// Execute one attempt of the activity
    async fn execute(&self, ctx: ActivityContext) -> Result<Option<Payload>, ActivityError>;
}

/// Execution context passed to each activity attempt
#[derive(Clone)]
pub struct ActivityContext {
    /// Id of the scheduling event within the workflow
    pub activity_id: String,

    pub activity_type: String,

    /// Workflow that scheduled the activity
    pub workflow_id: String,

    /// 1-based attempt number
    pub attempt: u32,

    /// Positional arguments
    pub args: Vec<Payload>,

    /// Cancelled when the workflow requests cancellation of this activity
    pub cancellation: CancellationToken,
}

impl ActivityContext {
    pub fn new(activity_type: impl Into<String>, args: Vec<Payload>) -> Self {
        Self {
            activity_id: String::new(),
            activity_type: activity_type.into(),
            workflow_id: String::new(),
            attempt: 1,
            args,
            cancellation: CancellationToken::new(),
        }
    }

    /// Get required argument or return error
    pub fn require_arg(&self, index: usize) -> Result<&Payload, ActivityError> {
        self.args
            .get(index)
            .ok_or(ActivityError::MissingArgument(index))
    }

    /// Decode a required JSON argument
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, ActivityError> {
        self.require_arg(index)?
            .to_json()
            .map_err(|e| ActivityError::InvalidArgument {
                index,
                reason: e.to_string(),
            })
    }
}
