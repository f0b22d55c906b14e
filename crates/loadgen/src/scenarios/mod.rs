//! Scenarios that ship with the load generator

mod echo_once;
mod state_signal_roundtrip;
mod throughput_stress;
mod workflow_with_single_noop_activity;

use crate::scenario::ScenarioRegistry;
use loadcore::{ConfigError, Payload};

pub use throughput_stress::ThroughputStress;

/// Register every built-in scenario under its name
pub fn register_builtin(registry: &mut ScenarioRegistry) -> Result<(), ConfigError> {
    registry.register("echo-once", echo_once::scenario())?;
    registry.register("state_signal_roundtrip", state_signal_roundtrip::scenario())?;
    registry.register("throughput_stress", throughput_stress::scenario())?;
    registry.register(
        "workflow_with_single_noop_activity",
        workflow_with_single_noop_activity::scenario(),
    )?;
    Ok(())
}

/// Decode a string workflow result, describing anything else
fn result_string(result: Option<Payload>) -> Result<String, String> {
    let payload = result.ok_or_else(|| "workflow returned no result".to_string())?;
    payload.to_json::<String>().map_err(|e| e.to_string())
}
