use super::{activity, await_result, PlatformInner, StartRequest};
use crate::client::{ClientError, WorkflowExecution};
use crate::host::{ChildHandle, ChildStarted, HostCapabilities, HostFuture, WorkflowHost, WorkflowInfo};
use crate::instance::InstanceMessage;
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use loadcore::kitchen_sink::{
    ExecuteActivityAction, ExecuteChildWorkflowAction, ParentClosePolicy, SendSignalAction,
};
use loadcore::{ActionError, Payload};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A child started by this run, remembered for the parent close policy
#[derive(Debug, Clone)]
pub(crate) struct ChildLink {
    pub execution: WorkflowExecution,
    pub policy: ParentClosePolicy,
}

pub(crate) type Children = Rc<RefCell<Vec<ChildLink>>>;

/// Host for one run on the local worker thread
pub(crate) struct LocalHost {
    platform: Weak<PlatformInner>,
    info: WorkflowInfo,
    capabilities: HostCapabilities,
    children: Children,
    patches: RefCell<HashSet<String>>,
    sequence: Cell<u64>,
}

impl LocalHost {
    pub fn new(
        platform: Weak<PlatformInner>,
        info: WorkflowInfo,
        capabilities: HostCapabilities,
        children: Children,
    ) -> Self {
        Self {
            platform,
            info,
            capabilities,
            children,
            patches: RefCell::new(HashSet::new()),
            sequence: Cell::new(0),
        }
    }

    fn next_sequence(&self) -> u64 {
        let next = self.sequence.get() + 1;
        self.sequence.set(next);
        next
    }

    fn execution(&self) -> WorkflowExecution {
        WorkflowExecution {
            workflow_id: self.info.workflow_id.clone(),
            run_id: self.info.run_id.clone(),
        }
    }
}

fn upgrade(platform: &Weak<PlatformInner>) -> Result<Arc<PlatformInner>, ActionError> {
    platform
        .upgrade()
        .ok_or_else(|| ActionError::Host("local platform stopped".to_string()))
}

/// Observe a spawned unit from the workflow side.
fn observe<T: 'static>(task: JoinHandle<Result<T, ActionError>>) -> HostFuture<T> {
    async move {
        task.await
            .map_err(|e| ActionError::Host(format!("host task failed: {}", e)))?
    }
    .boxed_local()
}

fn external_error(workflow_id: &str, error: ClientError) -> ActionError {
    ActionError::ExternalWorkflow {
        workflow_id: workflow_id.to_string(),
        message: error.to_string(),
    }
}

impl WorkflowHost for LocalHost {
    fn info(&self) -> &WorkflowInfo {
        &self.info
    }

    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    fn start_timer(&self, duration: Duration, scope: CancellationToken) -> HostFuture<()> {
        observe(tokio::task::spawn_local(async move {
            tokio::select! {
                biased;
                _ = scope.cancelled() => Err(ActionError::Cancelled),
                _ = tokio::time::sleep(duration) => Ok(()),
            }
        }))
    }

    fn start_activity(
        &self,
        action: ExecuteActivityAction,
        scope: CancellationToken,
    ) -> HostFuture<Option<Payload>> {
        let platform = self.platform.clone();
        let workflow_id = self.info.workflow_id.clone();
        let activity_id = self.next_sequence().to_string();

        observe(tokio::task::spawn_local(async move {
            // Cancelled before the worker picked it up: never runs.
            if scope.is_cancelled() {
                return Err(ActionError::Cancelled);
            }
            let platform = upgrade(&platform)?;
            activity::execute(&platform, workflow_id, activity_id, action, scope).await
        }))
    }

    fn start_child_workflow(
        &self,
        child: ExecuteChildWorkflowAction,
        scope: CancellationToken,
    ) -> ChildHandle {
        let (started_tx, started_rx) = oneshot::channel();
        let platform = self.platform.clone();
        let children = Rc::clone(&self.children);
        let fallback_id = format!("{}-child-{}", self.info.workflow_id, self.next_sequence());
        let fallback_queue = self.info.task_queue.clone();

        let task = tokio::task::spawn_local(async move {
            if scope.is_cancelled() {
                let _ = started_tx.send(Err(ActionError::Cancelled));
                return Err(ActionError::Cancelled);
            }

            let policy = child.parent_close_policy();
            let id_reuse_policy = child.workflow_id_reuse_policy();
            let run_timeout = loadcore::duration::to_std_opt(child.workflow_run_timeout.as_ref());
            let request = StartRequest {
                workflow_id: if child.workflow_id.is_empty() {
                    fallback_id
                } else {
                    child.workflow_id.clone()
                },
                workflow_type: child.workflow_type.clone(),
                task_queue: if child.task_queue.is_empty() {
                    fallback_queue
                } else {
                    child.task_queue.clone()
                },
                args: child.input,
                run_timeout,
                id_reuse_policy,
                error_when_already_started: true,
                search_attributes: child.search_attributes,
                memo: child.memo,
            };
            let workflow_id = request.workflow_id.clone();
            let child_error = |e: ClientError| ActionError::ChildWorkflow {
                workflow_id: workflow_id.clone(),
                message: e.to_string(),
            };

            let execution = match upgrade(&platform).and_then(|p| p.start_run(request).map_err(child_error)) {
                Ok(execution) => execution,
                Err(e) => {
                    let _ = started_tx.send(Err(e.clone()));
                    return Err(e);
                }
            };
            children.borrow_mut().push(ChildLink {
                execution: execution.clone(),
                policy,
            });
            let _ = started_tx.send(Ok(ChildStarted {
                workflow_id: execution.workflow_id.clone(),
                run_id: execution.run_id.clone(),
            }));

            let result = tokio::select! {
                biased;
                _ = scope.cancelled() => {
                    if let Ok(platform) = upgrade(&platform) {
                        let _ = platform.cancel(&execution.workflow_id, &execution.run_id);
                    }
                    await_result(&platform, &execution).await
                }
                result = await_result(&platform, &execution) => result,
            };
            result.map_err(|e| {
                if e.is_canceled() {
                    ActionError::Cancelled
                } else {
                    child_error(e)
                }
            })
        });

        ChildHandle {
            started: async move {
                started_rx
                    .await
                    .unwrap_or_else(|_| Err(ActionError::Host("child start abandoned".to_string())))
            }
            .boxed_local(),
            result: observe(task),
        }
    }

    fn signal_external(&self, signal: SendSignalAction, scope: CancellationToken) -> HostFuture<()> {
        let platform = self.platform.clone();

        observe(tokio::task::spawn_local(async move {
            if scope.is_cancelled() {
                return Err(ActionError::Cancelled);
            }
            let platform = upgrade(&platform)?;
            let mailbox = platform
                .running_mailbox(&signal.workflow_id, &signal.run_id)
                .map_err(|e| external_error(&signal.workflow_id, e))?;
            let message = InstanceMessage::Signal {
                name: signal.signal_name,
                args: signal.args,
            };
            tokio::select! {
                biased;
                _ = scope.cancelled() => Err(ActionError::Cancelled),
                sent = mailbox.send(message) => sent.map_err(|_| {
                    external_error(
                        &signal.workflow_id,
                        ClientError::AlreadyCompleted { workflow_id: signal.workflow_id.clone() },
                    )
                }),
            }
        }))
    }

    fn cancel_external(&self, workflow_id: &str, run_id: &str) -> HostFuture<()> {
        let requested = upgrade(&self.platform).and_then(|platform| {
            platform
                .cancel(workflow_id, run_id)
                .map_err(|e| external_error(workflow_id, e))
        });
        future::ready(requested).boxed_local()
    }

    fn upsert_search_attributes(
        &self,
        search_attributes: HashMap<String, Payload>,
    ) -> Result<(), ActionError> {
        upgrade(&self.platform)?
            .upsert_search_attributes(&self.execution(), search_attributes)
            .map_err(|e| ActionError::Host(e.to_string()))
    }

    fn upsert_memo(&self, memo: HashMap<String, Payload>) -> Result<(), ActionError> {
        upgrade(&self.platform)?
            .upsert_memo(&self.execution(), memo)
            .map_err(|e| ActionError::Host(e.to_string()))
    }

    // Every run is a first execution here, so all patches apply.
    fn patched(&self, patch_id: &str) -> bool {
        self.patches.borrow_mut().insert(patch_id.to_string());
        true
    }

    fn deprecate_patch(&self, patch_id: &str) {
        self.patches.borrow_mut().insert(patch_id.to_string());
    }

    fn next_tick(&self) -> LocalBoxFuture<'static, ()> {
        tokio::time::sleep(Duration::from_millis(1)).boxed_local()
    }
}
