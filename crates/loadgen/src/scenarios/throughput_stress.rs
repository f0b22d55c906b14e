use super::result_string;
use crate::config::RunConfiguration;
use crate::error::ScenarioError;
use crate::generic::GenericExecutor;
use crate::scenario::{Executor, Run, Scenario, ScenarioInfo};
use async_trait::async_trait;
use loadactivities::DELAY_ACTIVITY;
use loadcore::kitchen_sink::{ExecuteActivityAction, ExecuteChildWorkflowAction};
use loadcore::{Action, ActionSet, Choice, ConfigError, Payload, ProtocolError, WorkflowInput};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DONE: &str = "done";

pub(super) fn scenario() -> Scenario {
    Scenario::new(
        "Each iteration runs timers, activities and child workflows concurrently. \
         Options: timers, activities, children, timer-duration, activity-delay.",
        ThroughputStress,
    )
}

/// Fan-out of concurrent work per iteration, sized by scenario options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StressParams {
    timers: usize,
    activities: usize,
    children: usize,
    timer_duration: Duration,
    activity_delay: Duration,
}

impl StressParams {
    fn from_options(info: &ScenarioInfo) -> Result<Self, ConfigError> {
        let params = Self {
            timers: count(info, "timers", 3)?,
            activities: count(info, "activities", 3)?,
            children: count(info, "children", 1)?,
            timer_duration: info.option_duration("timer-duration", Duration::from_millis(10))?,
            activity_delay: info.option_duration("activity-delay", Duration::from_millis(5))?,
        };
        if params.timers + params.activities + params.children == 0 {
            return Err(ConfigError::Invalid(
                "throughput stress needs at least one timer, activity or child workflow".to_string(),
            ));
        }
        Ok(params)
    }

    fn input(&self) -> Result<WorkflowInput, ProtocolError> {
        let timer_ms = u64::try_from(self.timer_duration.as_millis()).unwrap_or(u64::MAX);
        let delay_ms = u64::try_from(self.activity_delay.as_millis()).unwrap_or(u64::MAX);
        let start_to_close = self
            .activity_delay
            .saturating_add(Duration::from_secs(30));

        let mut actions = Vec::with_capacity(self.timers + self.activities + self.children);
        actions.extend((0..self.timers).map(|_| Action::timer(timer_ms, Choice::WaitFinish)));
        for _ in 0..self.activities {
            actions.push(Action::activity(
                ExecuteActivityAction::new(DELAY_ACTIVITY)
                    .with_arg(Payload::json(&delay_ms)?)
                    .with_start_to_close(start_to_close),
            ));
        }
        actions.extend((0..self.children).map(|i| {
            let child = WorkflowInput::new(vec![ActionSet::sequential(vec![
                Action::timer(timer_ms, Choice::WaitFinish),
                Action::return_result(Payload::from(format!("child-{}", i))),
            ])]);
            // Child ids are derived from the parent's id by the host
            Action::child_workflow(
                ExecuteChildWorkflowAction::kitchen_sink("", &child).with_choice(Choice::WaitFinish),
            )
        }));

        Ok(WorkflowInput::new(vec![
            ActionSet::concurrent(actions),
            ActionSet::sequential(vec![Action::return_result(Payload::from(DONE))]),
        ]))
    }
}

fn count(info: &ScenarioInfo, name: &str, default: i64) -> Result<usize, ConfigError> {
    let value = info.option_int(name, default)?;
    usize::try_from(value).map_err(|_| ConfigError::InvalidOption {
        name: name.to_string(),
        value: value.to_string(),
        reason: "must not be negative".to_string(),
    })
}

/// Reads its options once, before any iteration starts, then runs as a
/// [`GenericExecutor`]
pub struct ThroughputStress;

impl ThroughputStress {
    fn executor(params: StressParams) -> GenericExecutor {
        GenericExecutor::new(move |run: Run| async move {
            let mut options = run.default_kitchen_sink_options();
            let workflow_id = options.start_options.id.clone();
            options.params = params.input()?;

            let result = run.execute_kitchen_sink_workflow(options).await?;
            match result_string(result) {
                Ok(value) if value == DONE => Ok(()),
                Ok(value) => Err(ScenarioError::UnexpectedResult {
                    workflow_id,
                    detail: format!("expected {:?}, got {:?}", DONE, value),
                }),
                Err(detail) => Err(ScenarioError::UnexpectedResult { workflow_id, detail }),
            }
        })
    }
}

#[async_trait]
impl Executor for ThroughputStress {
    async fn run(
        &self,
        cancellation: CancellationToken,
        info: Arc<ScenarioInfo>,
    ) -> Result<(), ScenarioError> {
        let params = StressParams::from_options(&info)?;
        tracing::info!(
            "Throughput stress with {} timers, {} activities and {} child workflows per iteration",
            params.timers,
            params.activities,
            params.children
        );
        Self::executor(params).run(cancellation, info).await
    }

    fn default_configuration(&self) -> Option<RunConfiguration> {
        Some(RunConfiguration::iterations(20).with_max_concurrent(5))
    }
}
