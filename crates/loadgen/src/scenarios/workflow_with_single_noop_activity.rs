use crate::generic::GenericExecutor;
use crate::scenario::Scenario;
use loadactivities::NOOP_ACTIVITY;
use loadcore::kitchen_sink::ExecuteActivityAction;
use loadcore::{Action, ActionSet, WorkflowInput};
use std::time::Duration;

pub(super) fn scenario() -> Scenario {
    Scenario::new(
        "Each iteration executes a single workflow with a noop activity.",
        GenericExecutor::new(|run| async move {
            let mut options = run.default_kitchen_sink_options();
            options.params = WorkflowInput::new(vec![ActionSet::sequential(vec![Action::activity(
                ExecuteActivityAction::new(NOOP_ACTIVITY)
                    .with_start_to_close(Duration::from_secs(3600)),
            )])]);
            run.execute_kitchen_sink_workflow(options).await?;
            Ok(())
        }),
    )
}
