//! Core abstractions for the kitchen-sink load generator
//!
//! This crate holds the action protocol that drives the kitchen-sink
//! workflow, the payload conventions shared with the orchestration
//! service, the error taxonomy and the activity contract. It has no
//! runtime dependencies on the interpreter or the harness.

mod activity;
pub mod duration;
mod error;
pub mod events;
pub mod kitchen_sink;
pub mod payload;

pub use activity::{Activity, ActivityContext};
pub use error::{
    ActionError, ActivityError, ConfigError, ProtocolError, TimeoutKind, UpdateRejected,
};
pub use events::*;
pub use kitchen_sink::{
    Action, ActionSet, AwaitableChoice, Choice, DoActionsUpdate, DoSignal, DoSignalActions,
    Payload, WorkflowInput, WorkflowState,
};

/// Workflow type name the kitchen-sink interpreter is registered under.
pub const KITCHEN_SINK_WORKFLOW_TYPE: &str = "kitchenSink";

/// Signal that carries a [`DoSignal`] payload.
pub const DO_ACTIONS_SIGNAL: &str = "do_actions_signal";

/// Update that carries a [`DoActionsUpdate`] payload.
pub const DO_ACTIONS_UPDATE: &str = "do_actions_update";

/// Query answered with the instance's [`WorkflowState`].
pub const REPORT_STATE_QUERY: &str = "report_state";

/// Result type for protocol-level operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
