use crate::config::{parse_duration, RunConfiguration};
use crate::error::ScenarioError;
use async_trait::async_trait;
use loadcore::{ConfigError, EventEmitter, Payload, WorkflowInput, KITCHEN_SINK_WORKFLOW_TYPE};
use loadruntime::{StartWorkflowOptions, WorkflowClient};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Logic that drives one scenario run to completion
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(
        &self,
        cancellation: CancellationToken,
        info: Arc<ScenarioInfo>,
    ) -> Result<(), ScenarioError>;

    /// Configuration used where the operator leaves limits unset
    fn default_configuration(&self) -> Option<RunConfiguration> {
        None
    }
}

#[derive(Clone)]
pub struct Scenario {
    pub description: String,
    pub executor: Arc<dyn Executor>,
}

impl Scenario {
    pub fn new(description: impl Into<String>, executor: impl Executor + 'static) -> Self {
        Self {
            description: description.into(),
            executor: Arc::new(executor),
        }
    }
}

/// Named scenarios, constructed once at startup and passed to whoever runs them
#[derive(Default)]
pub struct ScenarioRegistry {
    scenarios: BTreeMap<String, Scenario>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, scenario: Scenario) -> Result<(), ConfigError> {
        let name = name.into();
        if self.scenarios.contains_key(&name) {
            return Err(ConfigError::DuplicateScenario(name));
        }
        tracing::debug!("Registering scenario: {}", name);
        self.scenarios.insert(name, scenario);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Scenario, ConfigError> {
        self.scenarios
            .get(name)
            .ok_or_else(|| ConfigError::UnknownScenario(name.to_string()))
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.scenarios.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scenario)> {
        self.scenarios.iter().map(|(name, scenario)| (name.as_str(), scenario))
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// Task queue shared by every iteration of one scenario run
pub fn task_queue_for_run(scenario_name: &str, run_id: &str) -> String {
    format!("{}:{}", scenario_name, run_id)
}

/// Identity of one scenario run, shared read-only by all of its iterations
pub struct ScenarioInfo {
    pub scenario_name: String,
    /// Identifies this scenario run, not a workflow run
    pub run_id: String,
    pub namespace: String,
    pub client: Arc<dyn WorkflowClient>,
    pub events: EventEmitter,
    pub configuration: RunConfiguration,
    pub scenario_options: HashMap<String, String>,
}

impl ScenarioInfo {
    pub fn new(
        scenario_name: impl Into<String>,
        run_id: impl Into<String>,
        client: Arc<dyn WorkflowClient>,
    ) -> Self {
        let scenario_name = scenario_name.into();
        let run_id = run_id.into();
        Self {
            events: EventEmitter::disconnected(&scenario_name, &run_id),
            namespace: client.namespace().to_string(),
            scenario_name,
            run_id,
            client,
            configuration: RunConfiguration::default(),
            scenario_options: HashMap::new(),
        }
    }

    pub fn with_configuration(mut self, configuration: RunConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.scenario_options = options;
        self
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    fn option(&self, name: &str) -> Option<&str> {
        self.scenario_options
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn option_int(&self, name: &str, default: i64) -> Result<i64, ConfigError> {
        match self.option(name) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidOption {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: e.to_string(),
                }
            }),
        }
    }

    pub fn option_duration(&self, name: &str, default: Duration) -> Result<Duration, ConfigError> {
        match self.option(name) {
            None => Ok(default),
            Some(value) => parse_duration(value).map_err(|reason| ConfigError::InvalidOption {
                name: name.to_string(),
                value: value.to_string(),
                reason,
            }),
        }
    }

    pub fn task_queue(&self) -> String {
        task_queue_for_run(&self.scenario_name, &self.run_id)
    }

    pub fn new_run(self: &Arc<Self>, iteration: u64, cancellation: CancellationToken) -> Run {
        Run {
            info: Arc::clone(self),
            iteration,
            cancellation,
        }
    }
}

/// Start options plus the kitchen-sink input to start with
#[derive(Debug, Clone)]
pub struct KitchenSinkWorkflowOptions {
    pub params: WorkflowInput,
    pub start_options: StartWorkflowOptions,
}

/// One iteration of a scenario
pub struct Run {
    pub info: Arc<ScenarioInfo>,
    pub iteration: u64,
    pub cancellation: CancellationToken,
}

impl Run {
    pub fn default_start_options(&self) -> StartWorkflowOptions {
        StartWorkflowOptions {
            id: format!("w-{}-{}", self.info.run_id, self.iteration),
            task_queue: self.info.task_queue(),
            error_when_already_started: true,
            ..Default::default()
        }
    }

    pub fn default_kitchen_sink_options(&self) -> KitchenSinkWorkflowOptions {
        KitchenSinkWorkflowOptions {
            params: WorkflowInput::default(),
            start_options: self.default_start_options(),
        }
    }

    /// Start the kitchen-sink workflow and wait for it to close
    pub async fn execute_kitchen_sink_workflow(
        &self,
        options: KitchenSinkWorkflowOptions,
    ) -> Result<Option<Payload>, ScenarioError> {
        self.execute_any_workflow(
            options.start_options,
            KITCHEN_SINK_WORKFLOW_TYPE,
            vec![Payload::proto(&options.params)],
        )
        .await
    }

    /// Start any workflow type and wait for its result.
    ///
    /// A failed or cancelled workflow is reported with its id and run id.
    pub async fn execute_any_workflow(
        &self,
        options: StartWorkflowOptions,
        workflow_type: &str,
        args: Vec<Payload>,
    ) -> Result<Option<Payload>, ScenarioError> {
        tracing::debug!(
            "Executing workflow {} with id {} on task queue {}",
            workflow_type,
            options.id,
            options.task_queue
        );
        let workflow_id = options.id.clone();
        let client = &self.info.client;

        let execution = tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => return Err(ScenarioError::Cancelled),
            started = client.start_workflow(options, workflow_type, args) => {
                started.map_err(|source| ScenarioError::StartFailed { workflow_id, source })?
            }
        };
        self.info
            .events
            .workflow_started(&execution.workflow_id, &execution.run_id);

        let result = tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => return Err(ScenarioError::Cancelled),
            result = client.get_result(&execution) => result,
        };
        result.map_err(|source| ScenarioError::WorkflowFailed {
            workflow_id: execution.workflow_id,
            run_id: execution.run_id,
            source,
        })
    }
}

/// Fresh identifier for a scenario run
pub fn generate_run_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
