use super::host::{Children, LocalHost};
use super::store::RunClose;
use super::PlatformInner;
use crate::client::WorkflowExecution;
use crate::host::WorkflowInfo;
use crate::instance::{drive_instance, InstanceMessage, WorkflowOutcome};
use crate::interpreter::KitchenSinkWorkflow;
use loadcore::{ActionError, Payload, WorkflowInput};
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub(crate) enum WorkerCommand {
    Start(StartRun),
    Shutdown,
}

pub(crate) struct StartRun {
    pub info: WorkflowInfo,
    pub args: Vec<Payload>,
    pub run_timeout: Option<Duration>,
    pub mailbox: mpsc::Receiver<InstanceMessage>,
    pub root: CancellationToken,
}

pub(crate) fn spawn(
    platform: Weak<PlatformInner>,
    mut commands: mpsc::UnboundedReceiver<WorkerCommand>,
) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("local-workflow-worker".to_string())
        .spawn(move || {
            let instances = LocalSet::new();
            instances.block_on(&runtime, async move {
                while let Some(command) = commands.recv().await {
                    match command {
                        WorkerCommand::Start(run) => {
                            tokio::task::spawn_local(run_instance(platform.clone(), run));
                        }
                        WorkerCommand::Shutdown => break,
                    }
                }
                tracing::debug!("Local workflow worker stopped");
            });
        })?;
    Ok(())
}

async fn run_instance(platform: Weak<PlatformInner>, run: StartRun) {
    let StartRun {
        info,
        args,
        run_timeout,
        mailbox,
        root,
    } = run;
    let execution = WorkflowExecution {
        workflow_id: info.workflow_id.clone(),
        run_id: info.run_id.clone(),
    };
    let span = tracing::info_span!(
        "workflow",
        workflow_id = %execution.workflow_id,
        run_id = %execution.run_id
    );

    async move {
        let capabilities = match platform.upgrade() {
            Some(platform) => platform.config.capabilities,
            None => return,
        };
        let children = Children::default();
        let host = LocalHost::new(platform.clone(), info, capabilities, children.clone());

        // None means the run timeout fired
        let outcome = match decode_input(&args) {
            Ok(input) => {
                let workflow = KitchenSinkWorkflow::new(host);
                let driven = drive_instance(workflow, input, mailbox, root);
                match run_timeout {
                    Some(limit) => tokio::time::timeout(limit, driven).await.ok(),
                    None => Some(driven.await),
                }
            }
            Err(e) => Some(WorkflowOutcome::Failed(e)),
        };

        let Some(platform) = platform.upgrade() else {
            return;
        };
        let close = match outcome {
            None => RunClose::TimedOut,
            Some(WorkflowOutcome::Completed(result)) => RunClose::Completed(result),
            Some(WorkflowOutcome::Failed(e)) => {
                tracing::warn!("Workflow failed: {}", e);
                RunClose::Failed(failure_message(&e))
            }
            Some(WorkflowOutcome::Canceled) => RunClose::Canceled,
            Some(WorkflowOutcome::ContinuedAsNew(next)) => {
                match platform.continue_as_new(&execution, *next) {
                    Ok(next_run_id) => RunClose::ContinuedAsNew(next_run_id),
                    Err(e) => RunClose::Failed(format!("continue as new failed: {}", e)),
                }
            }
        };
        tracing::info!("Workflow run closed as {}", close.status());
        platform.close_run(&execution, close);

        let children = children.take();
        platform.apply_parent_close_policy(&children);
    }
    .instrument(span)
    .await
}

/// A missing or null first argument means "no initial actions".
fn decode_input(args: &[Payload]) -> Result<Option<WorkflowInput>, ActionError> {
    match args.first() {
        None => Ok(None),
        Some(payload) if payload.is_null() => Ok(None),
        Some(payload) => Ok(Some(payload.to_proto::<WorkflowInput>()?)),
    }
}

/// Application errors surface their own message; everything else its
/// display form.
fn failure_message(error: &ActionError) -> String {
    match error {
        ActionError::Application { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
