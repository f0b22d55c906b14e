//! The kitchen-sink action interpreter
//!
//! One [`KitchenSinkWorkflow`] exists per workflow run. It owns the run's
//! key/value state, the queue of action sets delivered by signals for the
//! main routine, and the host through which every side effect is issued.
//! Everything here runs on the single task that drives the instance, so
//! shared state lives behind `Rc` rather than locks.

use crate::awaitable::{Awaitable, ChildAwaitable};
use crate::host::WorkflowHost;
use futures::future::{self, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use loadcore::kitchen_sink::action::Variant;
use loadcore::kitchen_sink::{do_actions_update, do_signal_actions};
use loadcore::{
    Action, ActionError, ActionSet, Choice, DoActionsUpdate, DoSignalActions, Payload,
    ProtocolError, UpdateRejected, WorkflowInput, WorkflowState,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// `Ok(Some(_))` ends the enclosing routine with that result.
pub type ActionResult = Result<Option<Payload>, ActionError>;

/// Concurrent branches still running after their action set resolved.
pub(crate) type DetachedBranches = LocalBoxFuture<'static, Result<(), ActionError>>;

pub struct KitchenSinkWorkflow<H: WorkflowHost + 'static> {
    inner: Rc<Inner<H>>,
}

struct Inner<H> {
    host: H,
    state: watch::Sender<HashMap<String, String>>,
    signal_tx: mpsc::UnboundedSender<ActionSet>,
    signal_rx: RefCell<Option<mpsc::UnboundedReceiver<ActionSet>>>,
    detached_tx: mpsc::UnboundedSender<DetachedBranches>,
    detached_rx: RefCell<Option<mpsc::UnboundedReceiver<DetachedBranches>>>,
}

impl<H: WorkflowHost + 'static> Clone for KitchenSinkWorkflow<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H: WorkflowHost + 'static> KitchenSinkWorkflow<H> {
    pub fn new(host: H) -> Self {
        let (state, _) = watch::channel(HashMap::new());
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (detached_tx, detached_rx) = mpsc::unbounded_channel();
        Self {
            inner: Rc::new(Inner {
                host,
                state,
                signal_tx,
                signal_rx: RefCell::new(Some(signal_rx)),
                detached_tx,
                detached_rx: RefCell::new(Some(detached_rx)),
            }),
        }
    }

    pub fn host(&self) -> &H {
        &self.inner.host
    }

    /// The main routine.
    ///
    /// Initial action sets run in order and the run ends after them, with or
    /// without a result. Without initial actions the routine serves action
    /// sets queued by signals until one produces a result.
    pub async fn run(&self, input: Option<WorkflowInput>, scope: CancellationToken) -> ActionResult {
        let info = self.inner.host.info();
        tracing::info!(
            "Started kitchen sink workflow {} run {}",
            info.workflow_id,
            info.run_id
        );

        if let Some(input) = input.filter(|i| !i.initial_actions.is_empty()) {
            for set in input.initial_actions {
                if let Some(result) = self.handle_action_set(set, scope.clone()).await? {
                    return Ok(Some(result));
                }
            }
            return Ok(None);
        }

        let mut queue = self
            .inner
            .signal_rx
            .borrow_mut()
            .take()
            .ok_or_else(|| ActionError::Host("main routine started twice".to_string()))?;

        while let Some(set) = queue.recv().await {
            if let Some(result) = self.handle_action_set(set, scope.clone()).await? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Accept a `do_actions_signal`.
    ///
    /// In-main action sets are queued before this returns, so signals reach
    /// the main routine in arrival order. Inline sets run in the returned
    /// future.
    pub fn handle_signal(
        &self,
        actions: DoSignalActions,
        scope: CancellationToken,
    ) -> LocalBoxFuture<'static, Result<(), ActionError>> {
        match actions.variant {
            Some(do_signal_actions::Variant::DoActionsInMain(set)) => {
                tracing::debug!("Queueing {} signalled actions for main", set.actions.len());
                let queued = self
                    .inner
                    .signal_tx
                    .send(set)
                    .map_err(|_| ActionError::Host("signal queue closed".to_string()));
                future::ready(queued).boxed_local()
            }
            Some(do_signal_actions::Variant::DoActions(set)) => {
                let handled = self.handle_action_set(set, scope);
                async move { handled.await.map(|_| ()) }.boxed_local()
            }
            None => future::ready(Err(ProtocolError::EmptySignal.into())).boxed_local(),
        }
    }

    /// Runs before an update is accepted; must not touch state.
    pub fn validate_update(&self, update: &DoActionsUpdate) -> Result<(), UpdateRejected> {
        match &update.variant {
            Some(do_actions_update::Variant::DoActions(_)) => Ok(()),
            Some(do_actions_update::Variant::RejectMe(_)) => {
                tracing::info!("Rejecting update");
                Err(UpdateRejected("Rejected".to_string()))
            }
            None => Err(UpdateRejected(ProtocolError::EmptyUpdate.to_string())),
        }
    }

    /// Run an accepted update. Replies with the action result, or with the
    /// instance state encoded as a [`WorkflowState`] when there is none.
    pub fn handle_update(
        &self,
        update: DoActionsUpdate,
        scope: CancellationToken,
    ) -> LocalBoxFuture<'static, Result<Payload, ActionError>> {
        let this = self.clone();
        async move {
            let set = match update.variant {
                Some(do_actions_update::Variant::DoActions(set)) => set,
                _ => return Err(ProtocolError::EmptyUpdate.into()),
            };
            match this.handle_action_set(set, scope).await? {
                Some(result) => Ok(result),
                None => Ok(Payload::proto(&this.report_state())),
            }
        }
        .boxed_local()
    }

    pub fn report_state(&self) -> WorkflowState {
        WorkflowState {
            kvs: self.inner.state.borrow().clone(),
        }
    }

    pub fn handle_action_set(
        &self,
        set: ActionSet,
        scope: CancellationToken,
    ) -> LocalBoxFuture<'static, ActionResult> {
        let this = self.clone();
        async move {
            if !set.concurrent {
                for action in set.actions {
                    if let Some(result) = this.handle_action(action, scope.clone()).await? {
                        return Ok(Some(result));
                    }
                }
                return Ok(None);
            }

            let mut branches: FuturesUnordered<_> = set
                .actions
                .into_iter()
                .map(|action| this.handle_action(action, scope.child_token()))
                .collect();

            while let Some(outcome) = branches.next().await {
                match outcome {
                    Ok(None) => continue,
                    Ok(Some(result)) => {
                        this.detach(branches);
                        return Ok(Some(result));
                    }
                    Err(e) => {
                        this.detach(branches);
                        return Err(e);
                    }
                }
            }
            Ok(None)
        }
        .boxed_local()
    }

    /// Leftover branches keep running on the instance; their results are
    /// discarded because the set already resolved.
    fn detach(&self, mut branches: FuturesUnordered<LocalBoxFuture<'static, ActionResult>>) {
        if branches.is_empty() {
            return;
        }
        tracing::debug!("Detaching {} concurrent branches", branches.len());
        let lingering = async move {
            while let Some(outcome) = branches.next().await {
                outcome?;
            }
            Ok(())
        }
        .boxed_local();
        // The receiver lives as long as the instance driver.
        let _ = self.inner.detached_tx.send(lingering);
    }

    pub(crate) fn take_detached(&self) -> Option<mpsc::UnboundedReceiver<DetachedBranches>> {
        self.inner.detached_rx.borrow_mut().take()
    }

    pub fn handle_action(
        &self,
        action: Action,
        scope: CancellationToken,
    ) -> LocalBoxFuture<'static, ActionResult> {
        let this = self.clone();
        async move {
            let variant = action.variant.ok_or(ProtocolError::EmptyAction)?;
            tracing::debug!("Handling action {}", variant.name());
            let host = &this.inner.host;

            match variant {
                Variant::Timer(timer) => {
                    let choice = Choice::from_wire(timer.awaitable_choice.as_ref());
                    let unit = scope.child_token();
                    let fired =
                        host.start_timer(Duration::from_millis(timer.milliseconds), unit.clone());
                    Awaitable::new(unit, fired).drive(host, choice).await?;
                }
                Variant::ExecActivity(activity) => {
                    if activity.is_local() && !host.capabilities().local_activities {
                        return Err(ActionError::Unsupported("local activities".to_string()));
                    }
                    let choice = Choice::from_wire(activity.awaitable_choice.as_ref());
                    let unit = scope.child_token();
                    let completion = host.start_activity(activity, unit.clone());
                    Awaitable::new(unit, completion).drive(host, choice).await?;
                }
                Variant::ExecChildWorkflow(child) => {
                    let choice = Choice::from_wire(child.awaitable_choice.as_ref());
                    let unit = scope.child_token();
                    let handle = host.start_child_workflow(child, unit.clone());
                    ChildAwaitable::new(unit, handle).drive(host, choice).await?;
                }
                Variant::AwaitWorkflowState(wanted) => {
                    let mut state = this.inner.state.subscribe();
                    state
                        .wait_for(|kvs| kvs.get(&wanted.key) == Some(&wanted.value))
                        .await
                        .map(|_| ())
                        .map_err(|_| ActionError::Host("workflow state closed".to_string()))?;
                }
                Variant::SendSignal(signal) => {
                    let choice = Choice::from_wire(signal.awaitable_choice.as_ref());
                    let unit = scope.child_token();
                    let delivered = host.signal_external(signal, unit.clone());
                    Awaitable::new(unit, delivered).drive(host, choice).await?;
                }
                Variant::CancelWorkflow(cancel) => {
                    host.cancel_external(&cancel.workflow_id, &cancel.run_id)
                        .await?;
                }
                Variant::SetPatchMarker(marker) => {
                    let run_inner = if marker.deprecated {
                        host.deprecate_patch(&marker.patch_id);
                        true
                    } else {
                        host.patched(&marker.patch_id)
                    };
                    if let (true, Some(inner)) = (run_inner, marker.inner_action) {
                        return this.handle_action(*inner, scope).await;
                    }
                }
                Variant::UpsertSearchAttributes(upsert) => {
                    host.upsert_search_attributes(upsert.search_attributes)?;
                }
                Variant::UpsertMemo(upsert) => {
                    if !host.capabilities().upsert_memo {
                        return Err(ActionError::Unsupported("upsert memo".to_string()));
                    }
                    host.upsert_memo(upsert.upserted_memo)?;
                }
                Variant::SetWorkflowState(update) => {
                    this.inner.state.send_modify(|kvs| kvs.extend(update.kvs));
                }
                Variant::ReturnResult(ret) => {
                    return Ok(Some(ret.return_this.unwrap_or_else(Payload::null)));
                }
                Variant::ReturnError(ret) => {
                    let failure = ret.failure.unwrap_or_default();
                    return Err(ActionError::Application {
                        message: failure.message,
                        error_type: failure.error_type,
                        non_retryable: failure.non_retryable,
                    });
                }
                Variant::ContinueAsNew(next) => {
                    return Err(ActionError::ContinueAsNew(Box::new(next)));
                }
                Variant::NestedActionSet(set) => {
                    return this.handle_action_set(set, scope).await;
                }
            }
            Ok(None)
        }
        .boxed_local()
    }
}
