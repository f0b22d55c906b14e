//! Wire types for the kitchen-sink action protocol
//!
//! These are protobuf messages (prost derives, no build step). The decoder
//! skips unknown fields, so older interpreters accept newer payloads; an
//! `Action` whose variant is missing is rejected when it is executed.

use crate::ProtocolError;
use std::collections::HashMap;
use std::time::Duration;

/// Opaque value exchanged with the service (arguments, results, memo values).
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Payload {
    #[prost(map = "string, bytes", tag = "1")]
    pub metadata: HashMap<String, Vec<u8>>,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

/// Marker message for oneof cases that carry no data.
#[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
pub struct Empty {}

/// An ordered group of actions, run in sequence or concurrently.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionSet {
    #[prost(message, repeated, tag = "1")]
    pub actions: Vec<Action>,
    #[prost(bool, tag = "2")]
    pub concurrent: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Action {
    #[prost(
        oneof = "action::Variant",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14"
    )]
    pub variant: Option<action::Variant>,
}

pub mod action {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        #[prost(message, tag = "1")]
        Timer(super::TimerAction),
        #[prost(message, tag = "2")]
        ExecActivity(super::ExecuteActivityAction),
        #[prost(message, tag = "3")]
        ExecChildWorkflow(super::ExecuteChildWorkflowAction),
        #[prost(message, tag = "4")]
        AwaitWorkflowState(super::AwaitWorkflowState),
        #[prost(message, tag = "5")]
        SendSignal(super::SendSignalAction),
        #[prost(message, tag = "6")]
        CancelWorkflow(super::CancelWorkflowAction),
        #[prost(message, tag = "7")]
        SetPatchMarker(super::SetPatchMarkerAction),
        #[prost(message, tag = "8")]
        UpsertSearchAttributes(super::UpsertSearchAttributesAction),
        #[prost(message, tag = "9")]
        UpsertMemo(super::UpsertMemoAction),
        #[prost(message, tag = "10")]
        SetWorkflowState(super::WorkflowState),
        #[prost(message, tag = "11")]
        ReturnResult(super::ReturnResultAction),
        #[prost(message, tag = "12")]
        ReturnError(super::ReturnErrorAction),
        #[prost(message, tag = "13")]
        ContinueAsNew(super::ContinueAsNewAction),
        #[prost(message, tag = "14")]
        NestedActionSet(super::ActionSet),
    }

    impl Variant {
        /// Short name used in logs.
        pub fn name(&self) -> &'static str {
            match self {
                Variant::Timer(_) => "timer",
                Variant::ExecActivity(_) => "exec_activity",
                Variant::ExecChildWorkflow(_) => "exec_child_workflow",
                Variant::AwaitWorkflowState(_) => "await_workflow_state",
                Variant::SendSignal(_) => "send_signal",
                Variant::CancelWorkflow(_) => "cancel_workflow",
                Variant::SetPatchMarker(_) => "set_patch_marker",
                Variant::UpsertSearchAttributes(_) => "upsert_search_attributes",
                Variant::UpsertMemo(_) => "upsert_memo",
                Variant::SetWorkflowState(_) => "set_workflow_state",
                Variant::ReturnResult(_) => "return_result",
                Variant::ReturnError(_) => "return_error",
                Variant::ContinueAsNew(_) => "continue_as_new",
                Variant::NestedActionSet(_) => "nested_action_set",
            }
        }
    }
}

/// How the interpreter treats an asynchronous unit of work it launched.
#[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
pub struct AwaitableChoice {
    #[prost(oneof = "awaitable_choice::Condition", tags = "1, 2, 3, 4, 5")]
    pub condition: Option<awaitable_choice::Condition>,
}

pub mod awaitable_choice {
    #[derive(Clone, Copy, PartialEq, Eq, ::prost::Oneof)]
    pub enum Condition {
        #[prost(message, tag = "1")]
        Abandon(super::Empty),
        #[prost(message, tag = "2")]
        CancelBeforeStarted(super::Empty),
        #[prost(message, tag = "3")]
        CancelAfterStarted(super::Empty),
        #[prost(message, tag = "4")]
        CancelAfterCompleted(super::Empty),
        #[prost(message, tag = "5")]
        WaitFinish(super::Empty),
    }
}

/// Native form of [`AwaitableChoice`]; an unset condition is `WaitFinish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Choice {
    Abandon,
    CancelBeforeStarted,
    CancelAfterStarted,
    CancelAfterCompleted,
    #[default]
    WaitFinish,
}

impl Choice {
    pub fn from_wire(choice: Option<&AwaitableChoice>) -> Self {
        use awaitable_choice::Condition;
        match choice.and_then(|c| c.condition) {
            Some(Condition::Abandon(_)) => Choice::Abandon,
            Some(Condition::CancelBeforeStarted(_)) => Choice::CancelBeforeStarted,
            Some(Condition::CancelAfterStarted(_)) => Choice::CancelAfterStarted,
            Some(Condition::CancelAfterCompleted(_)) => Choice::CancelAfterCompleted,
            Some(Condition::WaitFinish(_)) | None => Choice::WaitFinish,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Choice::Abandon => "abandon",
            Choice::CancelBeforeStarted => "cancel_before_started",
            Choice::CancelAfterStarted => "cancel_after_started",
            Choice::CancelAfterCompleted => "cancel_after_completed",
            Choice::WaitFinish => "wait_finish",
        }
    }
}

impl From<Choice> for AwaitableChoice {
    fn from(choice: Choice) -> Self {
        use awaitable_choice::Condition;
        let condition = match choice {
            Choice::Abandon => Condition::Abandon(Empty {}),
            Choice::CancelBeforeStarted => Condition::CancelBeforeStarted(Empty {}),
            Choice::CancelAfterStarted => Condition::CancelAfterStarted(Empty {}),
            Choice::CancelAfterCompleted => Condition::CancelAfterCompleted(Empty {}),
            Choice::WaitFinish => Condition::WaitFinish(Empty {}),
        };
        AwaitableChoice {
            condition: Some(condition),
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimerAction {
    #[prost(uint64, tag = "1")]
    pub milliseconds: u64,
    #[prost(message, optional, tag = "2")]
    pub awaitable_choice: Option<AwaitableChoice>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteActivityAction {
    #[prost(string, tag = "1")]
    pub activity_type: String,
    #[prost(string, tag = "2")]
    pub task_queue: String,
    #[prost(map = "string, message", tag = "3")]
    pub headers: HashMap<String, Payload>,
    #[prost(message, optional, tag = "4")]
    pub schedule_to_close_timeout: Option<::prost_types::Duration>,
    #[prost(message, optional, tag = "5")]
    pub schedule_to_start_timeout: Option<::prost_types::Duration>,
    #[prost(message, optional, tag = "6")]
    pub start_to_close_timeout: Option<::prost_types::Duration>,
    #[prost(message, optional, tag = "7")]
    pub heartbeat_timeout: Option<::prost_types::Duration>,
    #[prost(message, optional, tag = "8")]
    pub retry_policy: Option<RetryPolicy>,
    #[prost(oneof = "execute_activity_action::Locality", tags = "9, 10")]
    pub locality: Option<execute_activity_action::Locality>,
    #[prost(message, optional, tag = "11")]
    pub awaitable_choice: Option<AwaitableChoice>,
    #[prost(message, repeated, tag = "12")]
    pub arguments: Vec<Payload>,
}

pub mod execute_activity_action {
    #[derive(Clone, Copy, PartialEq, Eq, ::prost::Oneof)]
    pub enum Locality {
        #[prost(message, tag = "9")]
        IsLocal(super::Empty),
        #[prost(message, tag = "10")]
        Remote(super::RemoteActivityOptions),
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
pub struct RemoteActivityOptions {
    #[prost(enumeration = "ActivityCancellationType", tag = "1")]
    pub cancellation_type: i32,
    #[prost(bool, tag = "2")]
    pub do_not_eagerly_execute: bool,
    #[prost(enumeration = "VersioningIntent", tag = "3")]
    pub versioning_intent: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteChildWorkflowAction {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(string, tag = "2")]
    pub workflow_id: String,
    #[prost(string, tag = "3")]
    pub workflow_type: String,
    #[prost(string, tag = "4")]
    pub task_queue: String,
    #[prost(message, repeated, tag = "5")]
    pub input: Vec<Payload>,
    #[prost(message, optional, tag = "6")]
    pub workflow_execution_timeout: Option<::prost_types::Duration>,
    #[prost(message, optional, tag = "7")]
    pub workflow_run_timeout: Option<::prost_types::Duration>,
    #[prost(message, optional, tag = "8")]
    pub workflow_task_timeout: Option<::prost_types::Duration>,
    #[prost(enumeration = "ParentClosePolicy", tag = "9")]
    pub parent_close_policy: i32,
    #[prost(enumeration = "WorkflowIdReusePolicy", tag = "10")]
    pub workflow_id_reuse_policy: i32,
    #[prost(message, optional, tag = "11")]
    pub retry_policy: Option<RetryPolicy>,
    #[prost(string, tag = "12")]
    pub cron_schedule: String,
    #[prost(map = "string, message", tag = "13")]
    pub headers: HashMap<String, Payload>,
    #[prost(map = "string, message", tag = "14")]
    pub memo: HashMap<String, Payload>,
    #[prost(map = "string, message", tag = "15")]
    pub search_attributes: HashMap<String, Payload>,
    #[prost(enumeration = "VersioningIntent", tag = "16")]
    pub versioning_intent: i32,
    #[prost(message, optional, tag = "17")]
    pub awaitable_choice: Option<AwaitableChoice>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct AwaitWorkflowState {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendSignalAction {
    #[prost(string, tag = "1")]
    pub workflow_id: String,
    #[prost(string, tag = "2")]
    pub run_id: String,
    #[prost(string, tag = "3")]
    pub signal_name: String,
    #[prost(message, repeated, tag = "4")]
    pub args: Vec<Payload>,
    #[prost(map = "string, message", tag = "5")]
    pub headers: HashMap<String, Payload>,
    #[prost(message, optional, tag = "6")]
    pub awaitable_choice: Option<AwaitableChoice>,
}

/// Request cancellation of another workflow instance.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct CancelWorkflowAction {
    #[prost(string, tag = "1")]
    pub workflow_id: String,
    #[prost(string, tag = "2")]
    pub run_id: String,
}

/// Gate `inner_action` behind a patch check.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetPatchMarkerAction {
    #[prost(string, tag = "1")]
    pub patch_id: String,
    #[prost(bool, tag = "2")]
    pub deprecated: bool,
    #[prost(message, optional, boxed, tag = "3")]
    pub inner_action: Option<Box<Action>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpsertSearchAttributesAction {
    #[prost(map = "string, message", tag = "1")]
    pub search_attributes: HashMap<String, Payload>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpsertMemoAction {
    #[prost(map = "string, message", tag = "1")]
    pub upserted_memo: HashMap<String, Payload>,
}

/// Key/value state of one workflow instance.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct WorkflowState {
    #[prost(map = "string, string", tag = "1")]
    pub kvs: HashMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReturnResultAction {
    #[prost(message, optional, tag = "1")]
    pub return_this: Option<Payload>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReturnErrorAction {
    #[prost(message, optional, tag = "1")]
    pub failure: Option<Failure>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Failure {
    #[prost(string, tag = "1")]
    pub message: String,
    #[prost(string, tag = "2")]
    pub error_type: String,
    #[prost(bool, tag = "3")]
    pub non_retryable: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContinueAsNewAction {
    #[prost(string, tag = "1")]
    pub workflow_type: String,
    #[prost(string, tag = "2")]
    pub task_queue: String,
    #[prost(message, repeated, tag = "3")]
    pub arguments: Vec<Payload>,
    #[prost(message, optional, tag = "4")]
    pub workflow_run_timeout: Option<::prost_types::Duration>,
    #[prost(message, optional, tag = "5")]
    pub workflow_task_timeout: Option<::prost_types::Duration>,
    #[prost(map = "string, message", tag = "6")]
    pub memo: HashMap<String, Payload>,
    #[prost(map = "string, message", tag = "7")]
    pub headers: HashMap<String, Payload>,
    #[prost(map = "string, message", tag = "8")]
    pub search_attributes: HashMap<String, Payload>,
    #[prost(message, optional, tag = "9")]
    pub retry_policy: Option<RetryPolicy>,
    #[prost(enumeration = "VersioningIntent", tag = "10")]
    pub versioning_intent: i32,
}

/// Zero values mean "use the platform default".
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RetryPolicy {
    #[prost(message, optional, tag = "1")]
    pub initial_interval: Option<::prost_types::Duration>,
    #[prost(double, tag = "2")]
    pub backoff_coefficient: f64,
    #[prost(message, optional, tag = "3")]
    pub maximum_interval: Option<::prost_types::Duration>,
    #[prost(int32, tag = "4")]
    pub maximum_attempts: i32,
    #[prost(string, repeated, tag = "5")]
    pub non_retryable_error_types: Vec<String>,
}

/// Start input of the kitchen-sink workflow.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WorkflowInput {
    #[prost(message, repeated, tag = "1")]
    pub initial_actions: Vec<ActionSet>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DoSignal {
    #[prost(oneof = "do_signal::Variant", tags = "1")]
    pub variant: Option<do_signal::Variant>,
}

pub mod do_signal {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        #[prost(message, tag = "1")]
        DoSignalActions(super::DoSignalActions),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DoSignalActions {
    #[prost(oneof = "do_signal_actions::Variant", tags = "1, 2")]
    pub variant: Option<do_signal_actions::Variant>,
}

pub mod do_signal_actions {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        /// Run inside the signal handler.
        #[prost(message, tag = "1")]
        DoActions(super::ActionSet),
        /// Queue for the main workflow routine.
        #[prost(message, tag = "2")]
        DoActionsInMain(super::ActionSet),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DoActionsUpdate {
    #[prost(oneof = "do_actions_update::Variant", tags = "1, 2")]
    pub variant: Option<do_actions_update::Variant>,
}

pub mod do_actions_update {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        #[prost(message, tag = "1")]
        DoActions(super::ActionSet),
        #[prost(message, tag = "2")]
        RejectMe(super::Empty),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum VersioningIntent {
    Unspecified = 0,
    Compatible = 1,
    Default = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ActivityCancellationType {
    TryCancel = 0,
    WaitCancellationCompleted = 1,
    Abandon = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ParentClosePolicy {
    Unspecified = 0,
    Terminate = 1,
    Abandon = 2,
    RequestCancel = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum WorkflowIdReusePolicy {
    Unspecified = 0,
    AllowDuplicate = 1,
    AllowDuplicateFailedOnly = 2,
    RejectDuplicate = 3,
    TerminateIfRunning = 4,
}

impl Action {
    /// The action's variant, or a protocol error when none is set.
    pub fn kind(&self) -> Result<&action::Variant, ProtocolError> {
        self.variant.as_ref().ok_or(ProtocolError::EmptyAction)
    }

    fn of(variant: action::Variant) -> Self {
        Action {
            variant: Some(variant),
        }
    }

    pub fn timer(milliseconds: u64, choice: Choice) -> Self {
        Self::of(action::Variant::Timer(TimerAction {
            milliseconds,
            awaitable_choice: Some(choice.into()),
        }))
    }

    pub fn activity(activity: ExecuteActivityAction) -> Self {
        Self::of(action::Variant::ExecActivity(activity))
    }

    pub fn child_workflow(child: ExecuteChildWorkflowAction) -> Self {
        Self::of(action::Variant::ExecChildWorkflow(child))
    }

    pub fn set_state(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut kvs = HashMap::new();
        kvs.insert(key.into(), value.into());
        Self::of(action::Variant::SetWorkflowState(WorkflowState { kvs }))
    }

    pub fn await_state(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::of(action::Variant::AwaitWorkflowState(AwaitWorkflowState {
            key: key.into(),
            value: value.into(),
        }))
    }

    pub fn nested(set: ActionSet) -> Self {
        Self::of(action::Variant::NestedActionSet(set))
    }

    pub fn send_signal(signal: SendSignalAction) -> Self {
        Self::of(action::Variant::SendSignal(signal))
    }

    pub fn cancel_workflow(workflow_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self::of(action::Variant::CancelWorkflow(CancelWorkflowAction {
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
        }))
    }

    pub fn patch_marker(patch_id: impl Into<String>, deprecated: bool, inner: Option<Action>) -> Self {
        Self::of(action::Variant::SetPatchMarker(SetPatchMarkerAction {
            patch_id: patch_id.into(),
            deprecated,
            inner_action: inner.map(Box::new),
        }))
    }

    pub fn upsert_search_attributes(search_attributes: HashMap<String, Payload>) -> Self {
        Self::of(action::Variant::UpsertSearchAttributes(
            UpsertSearchAttributesAction { search_attributes },
        ))
    }

    pub fn upsert_memo(upserted_memo: HashMap<String, Payload>) -> Self {
        Self::of(action::Variant::UpsertMemo(UpsertMemoAction { upserted_memo }))
    }

    pub fn return_result(payload: Payload) -> Self {
        Self::of(action::Variant::ReturnResult(ReturnResultAction {
            return_this: Some(payload),
        }))
    }

    pub fn return_error(message: impl Into<String>) -> Self {
        Self::of(action::Variant::ReturnError(ReturnErrorAction {
            failure: Some(Failure {
                message: message.into(),
                ..Default::default()
            }),
        }))
    }

    pub fn continue_as_new(continue_as_new: ContinueAsNewAction) -> Self {
        Self::of(action::Variant::ContinueAsNew(continue_as_new))
    }
}

impl ActionSet {
    pub fn sequential(actions: Vec<Action>) -> Self {
        Self {
            actions,
            concurrent: false,
        }
    }

    pub fn concurrent(actions: Vec<Action>) -> Self {
        Self {
            actions,
            concurrent: true,
        }
    }
}

impl ExecuteActivityAction {
    /// A remote activity with a 5 second start-to-close timeout.
    pub fn new(activity_type: impl Into<String>) -> Self {
        Self {
            activity_type: activity_type.into(),
            start_to_close_timeout: Some(crate::duration::from_std(Duration::from_secs(5))),
            locality: Some(execute_activity_action::Locality::Remote(
                RemoteActivityOptions::default(),
            )),
            ..Default::default()
        }
    }

    pub fn with_arg(mut self, arg: Payload) -> Self {
        self.arguments.push(arg);
        self
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.awaitable_choice = Some(choice.into());
        self
    }

    pub fn with_start_to_close(mut self, timeout: Duration) -> Self {
        self.start_to_close_timeout = Some(crate::duration::from_std(timeout));
        self
    }

    pub fn with_schedule_to_close(mut self, timeout: Duration) -> Self {
        self.schedule_to_close_timeout = Some(crate::duration::from_std(timeout));
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn with_cancellation_type(mut self, cancellation_type: ActivityCancellationType) -> Self {
        self.locality = Some(execute_activity_action::Locality::Remote(
            RemoteActivityOptions {
                cancellation_type: cancellation_type as i32,
                ..Default::default()
            },
        ));
        self
    }

    pub fn local(mut self) -> Self {
        self.locality = Some(execute_activity_action::Locality::IsLocal(Empty {}));
        self
    }

    pub fn is_local(&self) -> bool {
        matches!(
            self.locality,
            Some(execute_activity_action::Locality::IsLocal(_))
        )
    }
}

impl ExecuteChildWorkflowAction {
    /// A kitchen-sink child running `input` as its initial actions.
    pub fn kitchen_sink(workflow_id: impl Into<String>, input: &WorkflowInput) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            input: vec![Payload::proto(input)],
            ..Default::default()
        }
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.awaitable_choice = Some(choice.into());
        self
    }

    pub fn with_parent_close_policy(mut self, policy: ParentClosePolicy) -> Self {
        self.parent_close_policy = policy as i32;
        self
    }
}

impl SendSignalAction {
    /// A `do_actions_signal` carrying `actions` to another kitchen-sink instance.
    pub fn do_actions(
        workflow_id: impl Into<String>,
        actions: DoSignalActions,
        choice: Choice,
    ) -> Self {
        let signal = DoSignal {
            variant: Some(do_signal::Variant::DoSignalActions(actions)),
        };
        Self {
            workflow_id: workflow_id.into(),
            signal_name: crate::DO_ACTIONS_SIGNAL.to_string(),
            args: vec![Payload::proto(&signal)],
            awaitable_choice: Some(choice.into()),
            ..Default::default()
        }
    }
}

impl WorkflowInput {
    pub fn new(initial_actions: Vec<ActionSet>) -> Self {
        Self { initial_actions }
    }
}

impl DoSignal {
    pub fn actions(&self) -> Result<&DoSignalActions, ProtocolError> {
        match &self.variant {
            Some(do_signal::Variant::DoSignalActions(actions)) => Ok(actions),
            None => Err(ProtocolError::EmptySignal),
        }
    }
}

impl From<DoSignalActions> for DoSignal {
    fn from(actions: DoSignalActions) -> Self {
        DoSignal {
            variant: Some(do_signal::Variant::DoSignalActions(actions)),
        }
    }
}

impl DoSignalActions {
    pub fn in_main(set: ActionSet) -> Self {
        Self {
            variant: Some(do_signal_actions::Variant::DoActionsInMain(set)),
        }
    }

    pub fn inline(set: ActionSet) -> Self {
        Self {
            variant: Some(do_signal_actions::Variant::DoActions(set)),
        }
    }
}

impl DoActionsUpdate {
    pub fn run(set: ActionSet) -> Self {
        Self {
            variant: Some(do_actions_update::Variant::DoActions(set)),
        }
    }

    pub fn reject() -> Self {
        Self {
            variant: Some(do_actions_update::Variant::RejectMe(Empty {})),
        }
    }
}

impl WorkflowState {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.kvs.get(key).map(String::as_str)
    }
}
