use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted while a scenario runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    ScenarioStarted {
        scenario: String,
        run_id: String,
        timestamp: DateTime<Utc>,
    },
    ScenarioCompleted {
        scenario: String,
        run_id: String,
        iterations: u64,
        failures: u64,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    IterationStarted {
        scenario: String,
        run_id: String,
        iteration: u64,
        timestamp: DateTime<Utc>,
    },
    IterationCompleted {
        scenario: String,
        run_id: String,
        iteration: u64,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    IterationFailed {
        scenario: String,
        run_id: String,
        iteration: u64,
        error: String,
        timestamp: DateTime<Utc>,
    },
    WorkflowStarted {
        scenario: String,
        run_id: String,
        workflow_id: String,
        workflow_run_id: String,
        timestamp: DateTime<Utc>,
    },
}

/// Emitter bound to one scenario run
#[derive(Clone)]
pub struct EventEmitter {
    scenario: String,
    run_id: String,
    sender: broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    pub fn new(
        scenario: impl Into<String>,
        run_id: impl Into<String>,
        sender: broadcast::Sender<RunEvent>,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            run_id: run_id.into(),
            sender,
        }
    }

    /// An emitter nobody listens to
    pub fn disconnected(scenario: impl Into<String>, run_id: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(1);
        Self::new(scenario, run_id, sender)
    }

    fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn scenario_started(&self) {
        self.emit(RunEvent::ScenarioStarted {
            scenario: self.scenario.clone(),
            run_id: self.run_id.clone(),
            timestamp: Utc::now(),
        });
    }

    pub fn scenario_completed(&self, iterations: u64, failures: u64, duration_ms: u64) {
        self.emit(RunEvent::ScenarioCompleted {
            scenario: self.scenario.clone(),
            run_id: self.run_id.clone(),
            iterations,
            failures,
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    pub fn iteration_started(&self, iteration: u64) {
        self.emit(RunEvent::IterationStarted {
            scenario: self.scenario.clone(),
            run_id: self.run_id.clone(),
            iteration,
            timestamp: Utc::now(),
        });
    }

    pub fn iteration_completed(&self, iteration: u64, duration_ms: u64) {
        self.emit(RunEvent::IterationCompleted {
            scenario: self.scenario.clone(),
            run_id: self.run_id.clone(),
            iteration,
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    pub fn iteration_failed(&self, iteration: u64, error: impl Into<String>) {
        self.emit(RunEvent::IterationFailed {
            scenario: self.scenario.clone(),
            run_id: self.run_id.clone(),
            iteration,
            error: error.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn workflow_started(&self, workflow_id: impl Into<String>, workflow_run_id: impl Into<String>) {
        self.emit(RunEvent::WorkflowStarted {
            scenario: self.scenario.clone(),
            run_id: self.run_id.clone(),
            workflow_id: workflow_id.into(),
            workflow_run_id: workflow_run_id.into(),
            timestamp: Utc::now(),
        });
    }
}

/// Process-wide event bus; constructed once and handed to the harness
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    pub fn create_emitter(&self, scenario: &str, run_id: &str) -> EventEmitter {
        EventEmitter::new(scenario, run_id, self.sender.clone())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
