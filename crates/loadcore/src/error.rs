use crate::kitchen_sink::ContinueAsNewAction;
use thiserror::Error;

/// Malformed or unrecognized protocol input. Always fatal, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Action has no variant set (empty or unrecognized action)")]
    EmptyAction,

    #[error("Signal carries no actions")]
    EmptySignal,

    #[error("Update carries no actions")]
    EmptyUpdate,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Missing workflow input argument")]
    MissingInput,
}

/// Why an activity timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    StartToClose,
    ScheduleToClose,
}

impl std::fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TimeoutKind::StartToClose => "start-to-close",
            TimeoutKind::ScheduleToClose => "schedule-to-close",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActivityError {
    #[error("Missing required argument at position {0}")]
    MissingArgument(usize),

    #[error("Invalid argument at position {index}: {reason}")]
    InvalidArgument { index: usize, reason: String },

    #[error("{error_type}: {message}")]
    Failed {
        error_type: String,
        message: String,
        non_retryable: bool,
    },

    #[error("Unknown activity type: {0}")]
    UnknownType(String),

    #[error("Activity {0} timeout")]
    Timeout(TimeoutKind),

    #[error("Cancelled")]
    Cancelled,
}

impl ActivityError {
    pub fn failed(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        ActivityError::Failed {
            error_type: error_type.into(),
            message: message.into(),
            non_retryable: false,
        }
    }

    /// Name the retry policy's non-retryable list is matched against.
    pub fn error_type(&self) -> &str {
        match self {
            ActivityError::MissingArgument(_) | ActivityError::InvalidArgument { .. } => {
                "InvalidArgument"
            }
            ActivityError::Failed { error_type, .. } => error_type,
            ActivityError::UnknownType(_) => "UnknownActivityType",
            ActivityError::Timeout(_) => "Timeout",
            ActivityError::Cancelled => "Cancelled",
        }
    }

    /// Errors no retry policy can fix.
    pub fn is_non_retryable(&self) -> bool {
        match self {
            ActivityError::Failed { non_retryable, .. } => *non_retryable,
            ActivityError::MissingArgument(_)
            | ActivityError::InvalidArgument { .. }
            | ActivityError::UnknownType(_)
            | ActivityError::Cancelled => true,
            ActivityError::Timeout(kind) => *kind == TimeoutKind::ScheduleToClose,
        }
    }
}

/// Outcome of an action other than "completed normally".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Raised by `ReturnError`; terminates the instance as failed.
    #[error("Application error: {message}")]
    Application {
        message: String,
        error_type: String,
        non_retryable: bool,
    },

    #[error("Host does not support {0}")]
    Unsupported(String),

    #[error("Cancelled")]
    Cancelled,

    /// Not a failure: the instance ends and a successor run starts.
    #[error("Continue as new")]
    ContinueAsNew(Box<ContinueAsNewAction>),

    #[error("Activity failed: {0}")]
    Activity(ActivityError),

    #[error("Child workflow {workflow_id} failed: {message}")]
    ChildWorkflow { workflow_id: String, message: String },

    #[error("Signal to {workflow_id} failed: {message}")]
    ExternalWorkflow { workflow_id: String, message: String },

    #[error("Host error: {0}")]
    Host(String),
}

impl ActionError {
    /// Cancellation is an expected outcome of the awaitable policies.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            ActionError::Cancelled | ActionError::Activity(ActivityError::Cancelled)
        )
    }

    /// Defects that must surface immediately instead of being retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActionError::Protocol(_) | ActionError::Unsupported(_))
    }
}

impl From<ActivityError> for ActionError {
    fn from(e: ActivityError) -> Self {
        match e {
            ActivityError::Cancelled => ActionError::Cancelled,
            other => ActionError::Activity(other),
        }
    }
}

/// An update refused by its validator, before any state was touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Update rejected: {0}")]
pub struct UpdateRejected(pub String);

/// Operator-facing configuration errors, raised before any workflow starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Duplicate scenario with name: {0}")]
    DuplicateScenario(String),

    #[error("Scenario not found: {0}")]
    UnknownScenario(String),

    #[error("Iterations and duration are mutually exclusive")]
    ConflictingLimits,

    #[error("Invalid value {value:?} for option {name}: {reason}")]
    InvalidOption {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
