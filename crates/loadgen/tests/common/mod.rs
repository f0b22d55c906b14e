// crates/loadgen/tests/common/mod.rs

#![allow(dead_code)]

use loadgen::{RunConfiguration, ScenarioInfo};
use loadruntime::{ActivityRegistry, LocalPlatform, LocalPlatformConfig, WorkflowClient};
use std::collections::HashMap;
use std::sync::Arc;

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// A local platform with the standard activities registered
pub fn start_platform() -> (LocalPlatform, Arc<dyn WorkflowClient>) {
    let mut registry = ActivityRegistry::new();
    loadactivities::register_all(&mut registry);
    let platform =
        LocalPlatform::start(LocalPlatformConfig::default(), registry).expect("platform should start");
    let client: Arc<dyn WorkflowClient> = Arc::new(platform.client());
    (platform, client)
}

pub fn scenario_info(
    scenario: &str,
    run_id: &str,
    client: Arc<dyn WorkflowClient>,
    configuration: RunConfiguration,
) -> ScenarioInfo {
    ScenarioInfo::new(scenario, run_id, client).with_configuration(configuration)
}

pub fn options(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
