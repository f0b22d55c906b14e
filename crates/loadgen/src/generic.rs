use crate::config::{RunConfiguration, RunLimit};
use crate::error::ScenarioError;
use crate::scenario::{Executor, Run, ScenarioInfo};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

type ExecuteFn = Arc<dyn Fn(Run) -> BoxFuture<'static, Result<(), ScenarioError>> + Send + Sync>;

/// Runs an `execute` function once per iteration, up to `max_concurrent` at a
/// time, until the iteration count or the duration is used up.
#[derive(Clone)]
pub struct GenericExecutor {
    execute: ExecuteFn,
    default_configuration: Option<RunConfiguration>,
}

impl GenericExecutor {
    pub fn new<F, Fut>(execute: F) -> Self
    where
        F: Fn(Run) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ScenarioError>> + Send + 'static,
    {
        Self {
            execute: Arc::new(move |run| execute(run).boxed()),
            default_configuration: None,
        }
    }

    pub fn with_default_configuration(mut self, configuration: RunConfiguration) -> Self {
        self.default_configuration = Some(configuration);
        self
    }
}

#[async_trait]
impl Executor for GenericExecutor {
    async fn run(
        &self,
        cancellation: CancellationToken,
        info: Arc<ScenarioInfo>,
    ) -> Result<(), ScenarioError> {
        let config = info.configuration.clone().validate_and_default()?;
        let limit = config.limit();
        let started = Instant::now();
        // A deadline the clock cannot represent never arrives
        let deadline = match limit {
            RunLimit::Duration(duration) => started.checked_add(duration),
            RunLimit::Iterations(_) => None,
        };

        tracing::info!(
            "Starting scenario {} (run {}) with {:?}, max concurrent {}",
            info.scenario_name,
            info.run_id,
            limit,
            config.max_concurrent
        );
        info.events.scenario_started();

        // Cancelled by the caller, or by us on the first failure when failing fast
        let stop = cancellation.child_token();
        let mut running = FuturesUnordered::new();
        let mut launched: u64 = 0;
        let mut failures: u64 = 0;
        let mut first_failure: Option<ScenarioError> = None;

        loop {
            while running.len() < config.max_concurrent && !stop.is_cancelled() {
                let more = match limit {
                    RunLimit::Iterations(total) => launched < total,
                    RunLimit::Duration(_) => deadline.map_or(true, |d| Instant::now() < d),
                };
                if !more {
                    break;
                }

                launched += 1;
                let iteration = launched;
                let run = info.new_run(iteration, stop.child_token());
                let execute = Arc::clone(&self.execute);
                let events = info.events.clone();
                let span = tracing::info_span!(
                    "iteration",
                    scenario = %info.scenario_name,
                    iteration
                );

                let task = async move {
                    events.iteration_started(iteration);
                    let begun = Instant::now();
                    let result = execute(run).await;
                    (result, begun.elapsed())
                };
                running.push(tokio::spawn(task.instrument(span)).map(move |joined| (iteration, joined)));
            }

            let Some((iteration, joined)) = running.next().await else {
                break;
            };

            let result = match joined {
                Ok((result, elapsed)) => result.map(|_| elapsed),
                Err(e) => Err(ScenarioError::Panicked(e.to_string())),
            };
            match result {
                Ok(elapsed) => {
                    let duration_ms = elapsed.as_millis() as u64;
                    tracing::debug!("Iteration {} completed in {}ms", iteration, duration_ms);
                    info.events.iteration_completed(iteration, duration_ms);
                }
                // Iterations we stopped ourselves are not failures of their own
                Err(ScenarioError::Cancelled) if stop.is_cancelled() => {
                    tracing::debug!("Iteration {} cancelled", iteration);
                }
                Err(e) => {
                    tracing::error!("Iteration {} failed: {}", iteration, e);
                    info.events.iteration_failed(iteration, e.to_string());
                    failures += 1;
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                    if config.fail_fast {
                        tracing::warn!("Stopping scenario {} after first failure", info.scenario_name);
                        stop.cancel();
                    }
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        info.events.scenario_completed(launched, failures, duration_ms);
        tracing::info!(
            "Scenario {} finished {} iteration(s) in {}ms, {} failed",
            info.scenario_name,
            launched,
            duration_ms,
            failures
        );

        if let Some(first) = first_failure {
            return Err(ScenarioError::IterationsFailed {
                failed: failures,
                total: launched,
                first: Box::new(first),
            });
        }
        if cancellation.is_cancelled() {
            return Err(ScenarioError::Cancelled);
        }
        Ok(())
    }

    fn default_configuration(&self) -> Option<RunConfiguration> {
        self.default_configuration.clone()
    }
}
