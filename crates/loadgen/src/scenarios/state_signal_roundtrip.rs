use super::result_string;
use crate::error::ScenarioError;
use crate::generic::GenericExecutor;
use crate::scenario::{Run, Scenario};
use loadcore::{
    Action, ActionSet, DoActionsUpdate, DoSignal, DoSignalActions, Payload, WorkflowState,
    DO_ACTIONS_SIGNAL, DO_ACTIONS_UPDATE, KITCHEN_SINK_WORKFLOW_TYPE, REPORT_STATE_QUERY,
};
use loadruntime::{ClientError, WorkflowExecution};

const STATE_KEY: &str = "value";

pub(super) fn scenario() -> Scenario {
    Scenario::new(
        "Each iteration drives a signal-only workflow: set state by signal, \
         await it by update, read it by query, then finish by signal.",
        GenericExecutor::new(|run| async move {
            tokio::select! {
                biased;
                _ = run.cancellation.cancelled() => Err(ScenarioError::Cancelled),
                result = roundtrip(&run) => result,
            }
        }),
    )
}

async fn roundtrip(run: &Run) -> Result<(), ScenarioError> {
    let client = &run.info.client;
    let options = run.default_start_options();
    let workflow_id = options.id.clone();

    let execution = client
        .start_workflow(options, KITCHEN_SINK_WORKFLOW_TYPE, Vec::new())
        .await
        .map_err(|source| ScenarioError::StartFailed { workflow_id, source })?;
    run.info
        .events
        .workflow_started(&execution.workflow_id, &execution.run_id);
    let failed = |source: ClientError| attribute(&execution, source);

    let value = format!("iteration-{}", run.iteration);
    send(run, &execution, ActionSet::sequential(vec![Action::set_state(STATE_KEY, &value)]))
        .await
        .map_err(failed)?;

    let update = DoActionsUpdate::run(ActionSet::sequential(vec![Action::await_state(
        STATE_KEY, &value,
    )]));
    let reply = client
        .update_workflow(
            &execution.workflow_id,
            &execution.run_id,
            DO_ACTIONS_UPDATE,
            vec![Payload::proto(&update)],
        )
        .await
        .map_err(failed)?;
    check_state(&execution, reply.to_proto::<WorkflowState>()?, &value)?;

    let reported = client
        .query_workflow(&execution.workflow_id, &execution.run_id, REPORT_STATE_QUERY)
        .await
        .map_err(failed)?;
    check_state(&execution, reported.to_proto::<WorkflowState>()?, &value)?;

    send(
        run,
        &execution,
        ActionSet::sequential(vec![Action::return_result(Payload::from(value.as_str()))]),
    )
    .await
    .map_err(failed)?;

    let result = client.get_result(&execution).await.map_err(failed)?;
    match result_string(result) {
        Ok(returned) if returned == value => Ok(()),
        Ok(returned) => Err(unexpected(
            &execution,
            format!("expected result {:?}, got {:?}", value, returned),
        )),
        Err(detail) => Err(unexpected(&execution, detail)),
    }
}

async fn send(run: &Run, execution: &WorkflowExecution, set: ActionSet) -> Result<(), ClientError> {
    let signal = DoSignal::from(DoSignalActions::in_main(set));
    run.info
        .client
        .signal_workflow(
            &execution.workflow_id,
            &execution.run_id,
            DO_ACTIONS_SIGNAL,
            vec![Payload::proto(&signal)],
        )
        .await
}

fn check_state(
    execution: &WorkflowExecution,
    state: WorkflowState,
    expected: &str,
) -> Result<(), ScenarioError> {
    match state.get(STATE_KEY) {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(unexpected(
            execution,
            format!("expected state {}={:?}, got {:?}", STATE_KEY, expected, actual),
        )),
    }
}

fn attribute(execution: &WorkflowExecution, source: ClientError) -> ScenarioError {
    ScenarioError::WorkflowFailed {
        workflow_id: execution.workflow_id.clone(),
        run_id: execution.run_id.clone(),
        source,
    }
}

fn unexpected(execution: &WorkflowExecution, detail: String) -> ScenarioError {
    ScenarioError::UnexpectedResult {
        workflow_id: execution.workflow_id.clone(),
        detail,
    }
}
