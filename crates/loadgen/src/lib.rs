//! Scenario execution harness
//!
//! Scenarios are registered by name in a [`ScenarioRegistry`] built at
//! startup. Running one hands its [`Executor`] a shared [`ScenarioInfo`];
//! the [`GenericExecutor`] turns that into bounded, concurrent iterations,
//! each a [`Run`] that starts workflows through the client.

mod config;
mod error;
mod generic;
mod scenario;
pub mod scenarios;

pub use config::{
    parse_duration, RunConfiguration, RunLimit, DEFAULT_ITERATIONS, DEFAULT_MAX_CONCURRENT,
};
pub use error::ScenarioError;
pub use generic::GenericExecutor;
pub use scenario::{
    generate_run_id, task_queue_for_run, Executor, KitchenSinkWorkflowOptions, Run, Scenario,
    ScenarioInfo, ScenarioRegistry,
};
pub use scenarios::register_builtin;
