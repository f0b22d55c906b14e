use crate::client::{ClientError, WorkflowDescription, WorkflowExecution, WorkflowStatus};
use crate::instance::InstanceMessage;
use chrono::{DateTime, Utc};
use loadcore::Payload;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// How a run closed, as recorded by the platform
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RunClose {
    Completed(Option<Payload>),
    Failed(String),
    Canceled,
    Terminated(String),
    TimedOut,
    /// Carries the successor's run id
    ContinuedAsNew(String),
}

impl RunClose {
    pub fn status(&self) -> WorkflowStatus {
        match self {
            RunClose::Completed(_) => WorkflowStatus::Completed,
            RunClose::Failed(_) => WorkflowStatus::Failed,
            RunClose::Canceled => WorkflowStatus::Canceled,
            RunClose::Terminated(_) => WorkflowStatus::Terminated,
            RunClose::TimedOut => WorkflowStatus::TimedOut,
            RunClose::ContinuedAsNew(_) => WorkflowStatus::ContinuedAsNew,
        }
    }
}

pub(crate) struct RunRecord {
    pub run_id: String,
    pub workflow_type: String,
    pub task_queue: String,
    pub run_timeout: Option<Duration>,
    pub start_time: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
    pub status: WorkflowStatus,
    pub mailbox: mpsc::Sender<InstanceMessage>,
    pub root: CancellationToken,
    /// Set when the run is being terminated rather than cancelled
    pub termination: Option<String>,
    pub closed: watch::Sender<Option<RunClose>>,
    pub search_attributes: HashMap<String, Payload>,
    pub memo: HashMap<String, Payload>,
}

impl RunRecord {
    pub fn is_running(&self) -> bool {
        self.status == WorkflowStatus::Running
    }

    pub fn describe(&self, workflow_id: &str) -> WorkflowDescription {
        WorkflowDescription {
            execution: WorkflowExecution {
                workflow_id: workflow_id.to_string(),
                run_id: self.run_id.clone(),
            },
            workflow_type: self.workflow_type.clone(),
            task_queue: self.task_queue.clone(),
            status: self.status,
            start_time: self.start_time,
            close_time: self.close_time,
            search_attributes: self.search_attributes.clone(),
            memo: self.memo.clone(),
        }
    }
}

/// Runs of every workflow id, oldest first
pub(crate) type Workflows = HashMap<String, Vec<RunRecord>>;

#[derive(Default)]
pub(crate) struct Store {
    workflows: Mutex<Workflows>,
    /// Closed runs, oldest first
    retired: Mutex<VecDeque<WorkflowExecution>>,
}

impl Store {
    /// Critical sections never panic, so a poisoned lock still holds
    /// consistent data.
    pub fn lock(&self) -> MutexGuard<'_, Workflows> {
        self.workflows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_run<T>(
        &self,
        workflow_id: &str,
        run_id: &str,
        f: impl FnOnce(&mut RunRecord) -> T,
    ) -> Result<T, ClientError> {
        let mut workflows = self.lock();
        let run = find_run(&mut workflows, workflow_id, run_id)?;
        Ok(f(run))
    }

    /// Record a closed run and drop the oldest closed runs beyond `retain`.
    /// Returns how many were dropped.
    pub fn retire(&self, execution: WorkflowExecution, retain: usize) -> usize {
        let evicted: Vec<WorkflowExecution> = {
            let mut retired = self.retired.lock().unwrap_or_else(PoisonError::into_inner);
            retired.push_back(execution);
            let excess = retired.len().saturating_sub(retain);
            retired.drain(..excess).collect()
        };
        if evicted.is_empty() {
            return 0;
        }

        let mut workflows = self.lock();
        for execution in &evicted {
            if let Some(runs) = workflows.get_mut(&execution.workflow_id) {
                runs.retain(|r| r.run_id != execution.run_id);
                if runs.is_empty() {
                    workflows.remove(&execution.workflow_id);
                }
            }
        }
        evicted.len()
    }
}

/// An empty `run_id` selects the latest run.
pub(crate) fn find_run<'a>(
    workflows: &'a mut Workflows,
    workflow_id: &str,
    run_id: &str,
) -> Result<&'a mut RunRecord, ClientError> {
    let not_found = || ClientError::NotFound {
        workflow_id: workflow_id.to_string(),
    };
    let runs = workflows.get_mut(workflow_id).ok_or_else(not_found)?;
    let run = if run_id.is_empty() {
        runs.last_mut()
    } else {
        runs.iter_mut().find(|r| r.run_id == run_id)
    };
    run.ok_or_else(not_found)
}
