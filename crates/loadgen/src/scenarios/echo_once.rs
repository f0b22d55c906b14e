use super::result_string;
use crate::error::ScenarioError;
use crate::generic::GenericExecutor;
use crate::scenario::Scenario;
use loadactivities::ECHO_ACTIVITY;
use loadcore::kitchen_sink::ExecuteActivityAction;
use loadcore::{Action, ActionSet, Choice, Payload, WorkflowInput};

const MESSAGE: &str = "hi";

pub(super) fn scenario() -> Scenario {
    Scenario::new(
        "Each iteration echoes a string through an activity and returns it.",
        GenericExecutor::new(|run| async move {
            let mut options = run.default_kitchen_sink_options();
            let workflow_id = options.start_options.id.clone();
            options.params = WorkflowInput::new(vec![ActionSet::sequential(vec![
                Action::activity(
                    ExecuteActivityAction::new(ECHO_ACTIVITY)
                        .with_arg(Payload::from(MESSAGE))
                        .with_choice(Choice::WaitFinish),
                ),
                Action::return_result(Payload::from(MESSAGE)),
            ])]);

            let result = run.execute_kitchen_sink_workflow(options).await?;
            match result_string(result) {
                Ok(value) if value == MESSAGE => Ok(()),
                Ok(value) => Err(ScenarioError::UnexpectedResult {
                    workflow_id,
                    detail: format!("expected {:?}, got {:?}", MESSAGE, value),
                }),
                Err(detail) => Err(ScenarioError::UnexpectedResult { workflow_id, detail }),
            }
        }),
    )
}
