//! In-process stand-in for the orchestration service
//!
//! Every workflow instance runs on one dedicated worker thread (a
//! current-thread tokio runtime driving a `LocalSet`), so instances are
//! single threaded the way the interpreter expects. Clients may live on any
//! thread; they talk to the worker through channels and a shared record
//! store. Nothing is persisted and there is no replay.

mod activity;
mod client;
mod host;
mod store;
mod worker;

pub use client::LocalClient;

use crate::client::{ClientError, WorkflowDescription, WorkflowExecution, WorkflowStatus};
use crate::host::{HostCapabilities, WorkflowInfo};
use crate::instance::InstanceMessage;
use crate::registry::ActivityRegistry;
use chrono::Utc;
use host::ChildLink;
use loadcore::kitchen_sink::{ContinueAsNewAction, ParentClosePolicy, WorkflowIdReusePolicy};
use loadcore::{Payload, KITCHEN_SINK_WORKFLOW_TYPE};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use store::{find_run, RunClose, RunRecord, Store};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use worker::{StartRun, WorkerCommand};

/// Configuration for the local platform
#[derive(Debug, Clone)]
pub struct LocalPlatformConfig {
    pub namespace: String,
    pub capabilities: HostCapabilities,
    /// Caps retry policies that allow unlimited attempts
    pub max_activity_attempts: Option<u32>,
    /// Pending signals, updates and queries per instance
    pub mailbox_capacity: usize,
    /// Closed runs kept for describe and result lookups; older ones are
    /// forgotten
    pub retained_closed_runs: usize,
}

impl Default for LocalPlatformConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            capabilities: HostCapabilities::default(),
            max_activity_attempts: None,
            mailbox_capacity: 256,
            retained_closed_runs: 10_000,
        }
    }
}

/// Owner of the worker thread and the record store
#[derive(Clone)]
pub struct LocalPlatform {
    inner: Arc<PlatformInner>,
}

impl LocalPlatform {
    /// Spawn the worker thread. The worker stops when [`shutdown`] is called
    /// or when the last platform and client handle is dropped.
    ///
    /// [`shutdown`]: LocalPlatform::shutdown
    pub fn start(config: LocalPlatformConfig, activities: ActivityRegistry) -> std::io::Result<Self> {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let namespace = config.namespace.clone();
        let inner = Arc::new(PlatformInner {
            config,
            activities,
            store: Store::default(),
            commands,
        });
        worker::spawn(Arc::downgrade(&inner), command_rx)?;
        tracing::info!("Local platform started for namespace {}", namespace);
        Ok(Self { inner })
    }

    pub fn client(&self) -> LocalClient {
        LocalClient::new(Arc::clone(&self.inner))
    }

    pub fn config(&self) -> &LocalPlatformConfig {
        &self.inner.config
    }

    /// Stop the worker; running instances are dropped where they stand.
    pub fn shutdown(&self) {
        let _ = self.inner.commands.send(WorkerCommand::Shutdown);
    }
}

pub(crate) struct PlatformInner {
    config: LocalPlatformConfig,
    activities: ActivityRegistry,
    store: Store,
    commands: mpsc::UnboundedSender<WorkerCommand>,
}

/// A request to start a fresh workflow id or reuse one
pub(crate) struct StartRequest {
    pub workflow_id: String,
    pub workflow_type: String,
    pub task_queue: String,
    pub args: Vec<Payload>,
    pub run_timeout: Option<Duration>,
    pub id_reuse_policy: WorkflowIdReusePolicy,
    pub error_when_already_started: bool,
    pub search_attributes: HashMap<String, Payload>,
    pub memo: HashMap<String, Payload>,
}

struct RunSpec {
    workflow_type: String,
    task_queue: String,
    args: Vec<Payload>,
    run_timeout: Option<Duration>,
    search_attributes: HashMap<String, Payload>,
    memo: HashMap<String, Payload>,
}

fn resolve_workflow_type(workflow_type: &str) -> Result<String, ClientError> {
    match workflow_type {
        "" | KITCHEN_SINK_WORKFLOW_TYPE => Ok(KITCHEN_SINK_WORKFLOW_TYPE.to_string()),
        other => Err(ClientError::UnknownWorkflowType(other.to_string())),
    }
}

impl PlatformInner {
    pub(crate) fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub(crate) fn start_run(&self, request: StartRequest) -> Result<WorkflowExecution, ClientError> {
        let workflow_type = resolve_workflow_type(&request.workflow_type)?;
        if request.workflow_id.is_empty() {
            return Err(ClientError::InvalidArgument("workflow id is required".to_string()));
        }

        let mut workflows = self.store.lock();
        let runs = workflows.entry(request.workflow_id.clone()).or_default();

        if let Some(current) = runs.last_mut() {
            let already_started = || ClientError::AlreadyStarted {
                workflow_id: request.workflow_id.clone(),
            };
            if current.is_running() {
                match request.id_reuse_policy {
                    WorkflowIdReusePolicy::TerminateIfRunning => {
                        tracing::info!("Terminating running workflow {}", request.workflow_id);
                        current.termination = Some("terminated by a new run".to_string());
                        current.root.cancel();
                    }
                    _ if !request.error_when_already_started => {
                        return Ok(WorkflowExecution {
                            workflow_id: request.workflow_id.clone(),
                            run_id: current.run_id.clone(),
                        });
                    }
                    _ => return Err(already_started()),
                }
            } else {
                match request.id_reuse_policy {
                    WorkflowIdReusePolicy::RejectDuplicate => return Err(already_started()),
                    WorkflowIdReusePolicy::AllowDuplicateFailedOnly
                        if current.status == WorkflowStatus::Completed =>
                    {
                        return Err(already_started())
                    }
                    _ => {}
                }
            }
        }

        let spec = RunSpec {
            workflow_type,
            task_queue: request.task_queue,
            args: request.args,
            run_timeout: request.run_timeout,
            search_attributes: request.search_attributes,
            memo: request.memo,
        };
        self.launch(runs, &request.workflow_id, spec)
    }

    /// Start the successor run of a workflow that continued as new.
    fn continue_as_new(
        &self,
        execution: &WorkflowExecution,
        next: ContinueAsNewAction,
    ) -> Result<String, ClientError> {
        let mut workflows = self.store.lock();
        let previous = find_run(&mut workflows, &execution.workflow_id, &execution.run_id)?;

        let workflow_type = if next.workflow_type.is_empty() {
            previous.workflow_type.clone()
        } else {
            resolve_workflow_type(&next.workflow_type)?
        };
        let task_queue = if next.task_queue.is_empty() {
            previous.task_queue.clone()
        } else {
            next.task_queue
        };
        let run_timeout = loadcore::duration::to_std_opt(next.workflow_run_timeout.as_ref())
            .or(previous.run_timeout);
        let spec = RunSpec {
            workflow_type,
            task_queue,
            args: next.arguments,
            run_timeout,
            search_attributes: next.search_attributes,
            memo: next.memo,
        };

        let runs = workflows
            .get_mut(&execution.workflow_id)
            .ok_or_else(|| ClientError::NotFound {
                workflow_id: execution.workflow_id.clone(),
            })?;
        self.launch(runs, &execution.workflow_id, spec)
            .map(|started| started.run_id)
    }

    fn launch(
        &self,
        runs: &mut Vec<RunRecord>,
        workflow_id: &str,
        spec: RunSpec,
    ) -> Result<WorkflowExecution, ClientError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let (mailbox, mailbox_rx) = mpsc::channel(self.config.mailbox_capacity.max(1));
        let (closed, _) = watch::channel(None);
        let root = CancellationToken::new();

        let info = WorkflowInfo {
            namespace: self.config.namespace.clone(),
            workflow_id: workflow_id.to_string(),
            run_id: run_id.clone(),
            workflow_type: spec.workflow_type.clone(),
            task_queue: spec.task_queue.clone(),
        };
        self.commands
            .send(WorkerCommand::Start(StartRun {
                info,
                args: spec.args,
                run_timeout: spec.run_timeout,
                mailbox: mailbox_rx,
                root: root.clone(),
            }))
            .map_err(|_| ClientError::Unavailable("local worker stopped".to_string()))?;

        tracing::debug!("Started workflow {} run {}", workflow_id, run_id);
        runs.push(RunRecord {
            run_id: run_id.clone(),
            workflow_type: spec.workflow_type,
            task_queue: spec.task_queue,
            run_timeout: spec.run_timeout,
            start_time: Utc::now(),
            close_time: None,
            status: WorkflowStatus::Running,
            mailbox,
            root,
            termination: None,
            closed,
            search_attributes: spec.search_attributes,
            memo: spec.memo,
        });

        Ok(WorkflowExecution {
            workflow_id: workflow_id.to_string(),
            run_id,
        })
    }

    fn close_run(&self, execution: &WorkflowExecution, close: RunClose) {
        let mut workflows = self.store.lock();
        let run = match find_run(&mut workflows, &execution.workflow_id, &execution.run_id) {
            Ok(run) => run,
            Err(e) => {
                tracing::warn!("Closing unknown run: {}", e);
                return;
            }
        };
        let close = match (close, run.termination.take()) {
            (RunClose::Canceled, Some(reason)) => RunClose::Terminated(reason),
            (close, _) => close,
        };
        run.status = close.status();
        run.close_time = Some(Utc::now());
        run.closed.send_replace(Some(close));
        drop(workflows);

        let evicted = self
            .store
            .retire(execution.clone(), self.config.retained_closed_runs);
        if evicted > 0 {
            tracing::trace!("Evicted {} closed run(s)", evicted);
        }
    }

    fn apply_parent_close_policy(&self, children: &[ChildLink]) {
        for child in children {
            let execution = &child.execution;
            let applied = match child.policy {
                ParentClosePolicy::Abandon => continue,
                ParentClosePolicy::RequestCancel => {
                    self.cancel(&execution.workflow_id, &execution.run_id)
                }
                ParentClosePolicy::Terminate | ParentClosePolicy::Unspecified => self.terminate(
                    &execution.workflow_id,
                    &execution.run_id,
                    "parent workflow closed",
                ),
            };
            if let Err(e) = applied {
                tracing::debug!("Parent close policy not applied to {}: {}", execution.workflow_id, e);
            }
        }
    }

    fn running_mailbox(
        &self,
        workflow_id: &str,
        run_id: &str,
    ) -> Result<mpsc::Sender<InstanceMessage>, ClientError> {
        self.store.with_run(workflow_id, run_id, |run| {
            if run.is_running() {
                Ok(run.mailbox.clone())
            } else {
                Err(ClientError::AlreadyCompleted {
                    workflow_id: workflow_id.to_string(),
                })
            }
        })?
    }

    pub(crate) async fn signal(
        &self,
        workflow_id: &str,
        run_id: &str,
        signal_name: &str,
        args: Vec<Payload>,
    ) -> Result<(), ClientError> {
        let mailbox = self.running_mailbox(workflow_id, run_id)?;
        send_message(
            workflow_id,
            &mailbox,
            InstanceMessage::Signal {
                name: signal_name.to_string(),
                args,
            },
        )
        .await
    }

    pub(crate) async fn update(
        &self,
        workflow_id: &str,
        run_id: &str,
        update_name: &str,
        args: Vec<Payload>,
    ) -> Result<Payload, ClientError> {
        let mailbox = self.running_mailbox(workflow_id, run_id)?;
        let (reply, answer) = oneshot::channel();
        let message = InstanceMessage::Update {
            name: update_name.to_string(),
            args,
            reply,
        };
        send_message(workflow_id, &mailbox, message).await?;
        answer.await.map_err(|_| ClientError::AlreadyCompleted {
            workflow_id: workflow_id.to_string(),
        })?
    }

    pub(crate) async fn query(
        &self,
        workflow_id: &str,
        run_id: &str,
        query_type: &str,
    ) -> Result<Payload, ClientError> {
        let mailbox = self.running_mailbox(workflow_id, run_id)?;
        let (reply, answer) = oneshot::channel();
        let message = InstanceMessage::Query {
            name: query_type.to_string(),
            reply,
        };
        send_message(workflow_id, &mailbox, message).await?;
        answer.await.map_err(|_| ClientError::AlreadyCompleted {
            workflow_id: workflow_id.to_string(),
        })?
    }

    pub(crate) fn cancel(&self, workflow_id: &str, run_id: &str) -> Result<(), ClientError> {
        self.store.with_run(workflow_id, run_id, |run| {
            if !run.is_running() {
                return Err(ClientError::AlreadyCompleted {
                    workflow_id: workflow_id.to_string(),
                });
            }
            tracing::info!("Cancellation requested for workflow {}", workflow_id);
            run.root.cancel();
            Ok(())
        })?
    }

    pub(crate) fn terminate(
        &self,
        workflow_id: &str,
        run_id: &str,
        reason: &str,
    ) -> Result<(), ClientError> {
        self.store.with_run(workflow_id, run_id, |run| {
            if !run.is_running() {
                return Err(ClientError::AlreadyCompleted {
                    workflow_id: workflow_id.to_string(),
                });
            }
            tracing::info!("Terminating workflow {}: {}", workflow_id, reason);
            run.termination = Some(reason.to_string());
            run.root.cancel();
            Ok(())
        })?
    }

    pub(crate) fn describe(
        &self,
        workflow_id: &str,
        run_id: &str,
    ) -> Result<WorkflowDescription, ClientError> {
        self.store
            .with_run(workflow_id, run_id, |run| run.describe(workflow_id))
    }

    pub(crate) fn upsert_search_attributes(
        &self,
        execution: &WorkflowExecution,
        search_attributes: HashMap<String, Payload>,
    ) -> Result<(), ClientError> {
        self.store
            .with_run(&execution.workflow_id, &execution.run_id, |run| {
                run.search_attributes.extend(search_attributes)
            })
    }

    pub(crate) fn upsert_memo(
        &self,
        execution: &WorkflowExecution,
        memo: HashMap<String, Payload>,
    ) -> Result<(), ClientError> {
        self.store
            .with_run(&execution.workflow_id, &execution.run_id, |run| {
                run.memo.extend(memo)
            })
    }

    /// Resolves the run id (an empty one means latest) and subscribes to
    /// its close.
    fn watch_close(
        &self,
        workflow_id: &str,
        run_id: &str,
    ) -> Result<(String, watch::Receiver<Option<RunClose>>), ClientError> {
        self.store.with_run(workflow_id, run_id, |run| {
            (run.run_id.clone(), run.closed.subscribe())
        })
    }
}

async fn send_message(
    workflow_id: &str,
    mailbox: &mpsc::Sender<InstanceMessage>,
    message: InstanceMessage,
) -> Result<(), ClientError> {
    mailbox
        .send(message)
        .await
        .map_err(|_| ClientError::AlreadyCompleted {
            workflow_id: workflow_id.to_string(),
        })
}

/// Wait for a workflow's result, following continue-as-new to the last run.
///
/// Holds the platform only between runs so a waiting caller never keeps the
/// worker alive.
pub(crate) async fn await_result(
    platform: &Weak<PlatformInner>,
    execution: &WorkflowExecution,
) -> Result<Option<Payload>, ClientError> {
    let mut run_id = execution.run_id.clone();
    loop {
        let (resolved, mut closed) = upgrade(platform)?.watch_close(&execution.workflow_id, &run_id)?;
        let close = closed
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ClientError::Unavailable("local platform stopped".to_string()))?
            .clone();

        let failed = |status: WorkflowStatus, message: String| ClientError::WorkflowFailed { status, message };
        match close {
            Some(RunClose::Completed(result)) => return Ok(result),
            Some(RunClose::ContinuedAsNew(next)) => {
                tracing::debug!("Following workflow {} from run {} to {}", execution.workflow_id, resolved, next);
                run_id = next;
            }
            Some(RunClose::Failed(message)) => return Err(failed(WorkflowStatus::Failed, message)),
            Some(RunClose::Canceled) => {
                return Err(failed(WorkflowStatus::Canceled, "workflow canceled".to_string()))
            }
            Some(RunClose::Terminated(reason)) => return Err(failed(WorkflowStatus::Terminated, reason)),
            Some(RunClose::TimedOut) => {
                return Err(failed(WorkflowStatus::TimedOut, "workflow run timed out".to_string()))
            }
            None => return Err(ClientError::Unavailable("run closed without outcome".to_string())),
        }
    }
}

fn upgrade(platform: &Weak<PlatformInner>) -> Result<Arc<PlatformInner>, ClientError> {
    platform
        .upgrade()
        .ok_or_else(|| ClientError::Unavailable("local platform stopped".to_string()))
}
