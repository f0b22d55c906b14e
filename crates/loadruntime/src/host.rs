use futures::future::LocalBoxFuture;
use loadcore::kitchen_sink::{ExecuteActivityAction, ExecuteChildWorkflowAction, SendSignalAction};
use loadcore::{ActionError, Payload};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Handle to a unit of work the host has already issued.
///
/// The work is scheduled when the `start_*` call returns; polling the handle
/// only observes its outcome. Dropping it abandons the outcome, not the work.
pub type HostFuture<T> = LocalBoxFuture<'static, Result<T, ActionError>>;

/// Identity of the running instance
#[derive(Debug, Clone, Default)]
pub struct WorkflowInfo {
    pub namespace: String,
    pub workflow_id: String,
    pub run_id: String,
    pub workflow_type: String,
    pub task_queue: String,
}

/// Optional features a host may lack. Actions that need a missing one fail
/// with [`ActionError::Unsupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    pub upsert_memo: bool,
    pub local_activities: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            upsert_memo: true,
            local_activities: true,
        }
    }
}

/// Returned once a child workflow has been accepted by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildStarted {
    pub workflow_id: String,
    pub run_id: String,
}

/// A child workflow has two observable milestones.
pub struct ChildHandle {
    pub started: HostFuture<ChildStarted>,
    pub result: HostFuture<Option<Payload>>,
}

/// Everything the interpreter may ask of the orchestration platform.
///
/// Implementations are single threaded: one instance's host is only ever
/// touched from the task driving that instance. Every unit of work takes a
/// cancellation scope; cancelling the scope is how the interpreter requests
/// cancellation of that unit.
pub trait WorkflowHost {
    fn info(&self) -> &WorkflowInfo;

    fn capabilities(&self) -> HostCapabilities;

    fn start_timer(&self, duration: Duration, scope: CancellationToken) -> HostFuture<()>;

    fn start_activity(
        &self,
        activity: ExecuteActivityAction,
        scope: CancellationToken,
    ) -> HostFuture<Option<Payload>>;

    fn start_child_workflow(
        &self,
        child: ExecuteChildWorkflowAction,
        scope: CancellationToken,
    ) -> ChildHandle;

    fn signal_external(&self, signal: SendSignalAction, scope: CancellationToken)
        -> HostFuture<()>;

    /// Request cancellation of another instance. An empty run id targets the
    /// current run of `workflow_id`.
    fn cancel_external(&self, workflow_id: &str, run_id: &str) -> HostFuture<()>;

    fn upsert_search_attributes(
        &self,
        search_attributes: HashMap<String, Payload>,
    ) -> Result<(), ActionError>;

    fn upsert_memo(&self, memo: HashMap<String, Payload>) -> Result<(), ActionError>;

    /// Whether code guarded by `patch_id` should run in this execution.
    fn patched(&self, patch_id: &str) -> bool;

    /// Records that `patch_id` is deprecated. Guarded code always runs.
    fn deprecate_patch(&self, patch_id: &str);

    /// Resolves once the host has made progress past the current instant.
    fn next_tick(&self) -> LocalBoxFuture<'static, ()>;
}
