use crate::client::ClientError;
use crate::host::WorkflowHost;
use crate::interpreter::KitchenSinkWorkflow;
use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use loadcore::kitchen_sink::ContinueAsNewAction;
use loadcore::{
    ActionError, DoActionsUpdate, DoSignal, Payload, ProtocolError, WorkflowInput,
    DO_ACTIONS_SIGNAL, DO_ACTIONS_UPDATE, REPORT_STATE_QUERY,
};
use prost::Message;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Requests delivered to a running instance
#[derive(Debug)]
pub enum InstanceMessage {
    Signal {
        name: String,
        args: Vec<Payload>,
    },
    Update {
        name: String,
        args: Vec<Payload>,
        reply: oneshot::Sender<Result<Payload, ClientError>>,
    },
    Query {
        name: String,
        reply: oneshot::Sender<Result<Payload, ClientError>>,
    },
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    Completed(Option<Payload>),
    Failed(ActionError),
    Canceled,
    ContinuedAsNew(Box<ContinueAsNewAction>),
}

impl WorkflowOutcome {
    fn from_result(result: Result<Option<Payload>, ActionError>) -> Self {
        match result {
            Ok(value) => WorkflowOutcome::Completed(value),
            Err(ActionError::ContinueAsNew(next)) => WorkflowOutcome::ContinuedAsNew(next),
            Err(e) if e.is_cancellation() => WorkflowOutcome::Canceled,
            Err(e) => WorkflowOutcome::Failed(e),
        }
    }
}

enum HandlerDone {
    Signal(Result<(), ActionError>),
    /// The reply has been sent; the error is kept so fatal ones end the run.
    Update(Result<(), ActionError>),
    Detached(Result<(), ActionError>),
}

/// Drive one instance to completion.
///
/// The main routine, signal and update handlers, and detached concurrent
/// branches are polled together on the calling task. Queries are answered
/// between polls. Cancelling `root` ends the run as canceled.
pub async fn drive_instance<H: WorkflowHost + 'static>(
    workflow: KitchenSinkWorkflow<H>,
    input: Option<WorkflowInput>,
    mut mailbox: mpsc::Receiver<InstanceMessage>,
    root: CancellationToken,
) -> WorkflowOutcome {
    let main = workflow.run(input, root.clone());
    tokio::pin!(main);

    let mut detached = workflow.take_detached();
    let mut handlers: FuturesUnordered<LocalBoxFuture<'static, HandlerDone>> =
        FuturesUnordered::new();
    let mut mailbox_open = true;

    loop {
        tokio::select! {
            biased;

            _ = root.cancelled() => {
                tracing::info!("Workflow {} canceled", workflow.host().info().workflow_id);
                return WorkflowOutcome::Canceled;
            }

            result = &mut main => return WorkflowOutcome::from_result(result),

            Some(done) = handlers.next(), if !handlers.is_empty() => match done {
                HandlerDone::Signal(Err(e)) => {
                    tracing::error!("Signal handler failed: {}", e);
                    return WorkflowOutcome::from_result(Err(e));
                }
                HandlerDone::Update(Err(e)) | HandlerDone::Detached(Err(e)) if e.is_fatal() => {
                    tracing::error!("Fatal error outside the main routine: {}", e);
                    return WorkflowOutcome::Failed(e);
                }
                HandlerDone::Update(Err(e)) => {
                    tracing::debug!("Update failed: {}", e);
                }
                HandlerDone::Detached(Err(e)) => {
                    tracing::warn!("Detached branch failed after its set resolved: {}", e);
                }
                HandlerDone::Signal(Ok(()))
                | HandlerDone::Update(Ok(()))
                | HandlerDone::Detached(Ok(())) => {}
            },

            Some(branch) = recv_detached(&mut detached) => {
                handlers.push(branch.map(HandlerDone::Detached).boxed_local());
            }

            message = mailbox.recv(), if mailbox_open => match message {
                Some(message) => {
                    if let Err(e) = dispatch(&workflow, message, &root, &mut handlers) {
                        tracing::error!("Rejected signal payload: {}", e);
                        return WorkflowOutcome::Failed(e);
                    }
                }
                None => mailbox_open = false,
            },
        }
    }
}

async fn recv_detached<T>(rx: &mut Option<mpsc::UnboundedReceiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => futures::future::pending().await,
    }
}

fn dispatch<H: WorkflowHost + 'static>(
    workflow: &KitchenSinkWorkflow<H>,
    message: InstanceMessage,
    root: &CancellationToken,
    handlers: &mut FuturesUnordered<LocalBoxFuture<'static, HandlerDone>>,
) -> Result<(), ActionError> {
    match message {
        InstanceMessage::Signal { name, args } => {
            if name != DO_ACTIONS_SIGNAL {
                tracing::warn!("Dropping signal with unknown name {}", name);
                return Ok(());
            }
            let signal: DoSignal = decode_first(&args)?;
            let actions = signal.actions()?.clone();
            let handled = workflow.handle_signal(actions, root.child_token());
            handlers.push(handled.map(HandlerDone::Signal).boxed_local());
        }
        InstanceMessage::Update { name, args, reply } => {
            if name != DO_ACTIONS_UPDATE {
                let _ = reply.send(Err(ClientError::UnknownUpdate(name)));
                return Ok(());
            }
            let update: DoActionsUpdate = match decode_first(&args) {
                Ok(update) => update,
                Err(e) => {
                    let _ = reply.send(Err(ClientError::UpdateRejected(e.to_string())));
                    return Ok(());
                }
            };
            if let Err(rejected) = workflow.validate_update(&update) {
                let _ = reply.send(Err(ClientError::UpdateRejected(rejected.0)));
                return Ok(());
            }
            let handled = workflow.handle_update(update, root.child_token());
            handlers.push(
                async move {
                    match handled.await {
                        Ok(payload) => {
                            let _ = reply.send(Ok(payload));
                            HandlerDone::Update(Ok(()))
                        }
                        Err(e) => {
                            let _ = reply.send(Err(ClientError::UpdateFailed(e.to_string())));
                            HandlerDone::Update(Err(e))
                        }
                    }
                }
                .boxed_local(),
            );
        }
        InstanceMessage::Query { name, reply } => {
            let answer = if name == REPORT_STATE_QUERY {
                Ok(Payload::proto(&workflow.report_state()))
            } else {
                Err(ClientError::UnknownQuery(name))
            };
            let _ = reply.send(answer);
        }
    }
    Ok(())
}

fn decode_first<M: Message + Default>(args: &[Payload]) -> Result<M, ActionError> {
    let payload = args.first().ok_or(ProtocolError::MissingInput)?;
    Ok(payload.to_proto::<M>()?)
}
