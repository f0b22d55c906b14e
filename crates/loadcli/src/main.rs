// crates/loadcli/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loadcore::{EventBus, RunEvent};
use loadgen::{RunConfiguration, ScenarioInfo, ScenarioRegistry};
use loadruntime::{ActivityRegistry, LocalPlatform, LocalPlatformConfig, WorkflowClient};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loadgen")]
#[command(about = "Kitchen-sink workflow load generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a registered scenario against the local platform
    RunScenario {
        /// Scenario name
        #[arg(short, long)]
        scenario: String,

        /// Number of iterations (conflicts with --duration)
        #[arg(long, conflicts_with = "duration")]
        iterations: Option<u64>,

        /// How long to keep starting iterations, e.g. 30s or 1m30s
        #[arg(long, value_parser = parse_duration_arg)]
        duration: Option<Duration>,

        /// Iterations allowed in flight at once
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Stop at the first failed iteration
        #[arg(long)]
        fail_fast: bool,

        /// Run id used for workflow ids and the task queue; generated if absent
        #[arg(long)]
        run_id: Option<String>,

        /// Scenario option as key=value, may be repeated
        #[arg(long = "option", value_parser = parse_key_value)]
        options: Vec<(String, String)>,

        #[arg(long, default_value = "default")]
        namespace: String,

        /// Cap for retry policies that allow unlimited activity attempts
        #[arg(long)]
        max_activity_attempts: Option<u32>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List available scenarios
    ListScenarios,
}

fn parse_duration_arg(value: &str) -> Result<Duration, String> {
    loadgen::parse_duration(value)
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    let (key, val) = value
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", value))?;
    if key.is_empty() {
        return Err(format!("empty option name in {:?}", value));
    }
    Ok((key.to_string(), val.to_string()))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn scenario_registry() -> Result<ScenarioRegistry> {
    let mut registry = ScenarioRegistry::new();
    loadgen::register_builtin(&mut registry)?;
    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::RunScenario {
            scenario,
            iterations,
            duration,
            max_concurrent,
            fail_fast,
            run_id,
            options,
            namespace,
            max_activity_attempts,
            verbose,
        } => {
            init_logging(verbose);

            let configuration = RunConfiguration {
                iterations: iterations.unwrap_or(0),
                duration,
                max_concurrent: max_concurrent.unwrap_or(0),
                fail_fast,
            };
            let platform_config = LocalPlatformConfig {
                namespace,
                max_activity_attempts,
                ..Default::default()
            };
            run_scenario(
                &scenario,
                configuration,
                run_id.unwrap_or_else(loadgen::generate_run_id),
                options.into_iter().collect(),
                platform_config,
            )
            .await?;
        }

        Commands::ListScenarios => {
            list_scenarios()?;
        }
    }

    Ok(())
}

async fn run_scenario(
    name: &str,
    configuration: RunConfiguration,
    run_id: String,
    scenario_options: HashMap<String, String>,
    platform_config: LocalPlatformConfig,
) -> Result<()> {
    let registry = scenario_registry()?;
    let scenario = registry.get(name)?;

    // Surface configuration mistakes before anything starts
    let configuration = match scenario.executor.default_configuration() {
        Some(defaults) => configuration.with_fallback(&defaults),
        None => configuration,
    };
    let configuration = configuration
        .validate_and_default()
        .context("invalid run configuration")?;

    println!("🚀 Running scenario: {}", name);
    println!("   {}", scenario.description);
    println!("   Run ID: {}", run_id);
    println!("   Configuration: {}", serde_json::to_string(&configuration)?);
    println!();

    let mut activities = ActivityRegistry::new();
    loadactivities::register_all(&mut activities);
    let platform = LocalPlatform::start(platform_config, activities)
        .context("failed to start local platform")?;
    let client: Arc<dyn WorkflowClient> = Arc::new(platform.client());

    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let info = ScenarioInfo::new(name, &run_id, client)
        .with_configuration(configuration)
        .with_options(scenario_options)
        .with_events(bus.create_emitter(name, &run_id));

    // Subscribe to events for real-time output
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RunEvent::ScenarioStarted { .. } => {
                    println!("▶️  Scenario started");
                }
                RunEvent::WorkflowStarted {
                    workflow_id,
                    workflow_run_id,
                    ..
                } => {
                    tracing::debug!("Workflow {} started (run {})", workflow_id, workflow_run_id);
                }
                RunEvent::IterationStarted { .. } => {}
                RunEvent::IterationCompleted {
                    iteration,
                    duration_ms,
                    ..
                } => {
                    println!("  ✅ Iteration {} completed in {}ms", iteration, duration_ms);
                }
                RunEvent::IterationFailed { iteration, error, .. } => {
                    println!("  ❌ Iteration {} failed: {}", iteration, error);
                }
                RunEvent::ScenarioCompleted {
                    iterations,
                    failures,
                    duration_ms,
                    ..
                } => {
                    println!();
                    println!("📊 Execution Summary:");
                    println!("   Iterations: {}", iterations);
                    println!("   Failures: {}", failures);
                    println!("   Duration: {}ms", duration_ms);
                }
            }
        }
    });

    let cancellation = CancellationToken::new();
    let interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling scenario");
            interrupt.cancel();
        }
    });

    let result = scenario.executor.run(cancellation, Arc::new(info)).await;

    // Wait for events to finish printing
    tokio::time::sleep(Duration::from_millis(100)).await;
    event_task.abort();
    platform.shutdown();

    result.with_context(|| format!("scenario {} failed", name))?;
    println!("✨ Scenario {} completed successfully", name);
    Ok(())
}

fn list_scenarios() -> Result<()> {
    println!("📦 Available Scenarios:");
    println!();

    let registry = scenario_registry()?;
    for (name, scenario) in registry.iter() {
        println!("  • {}", name);
        println!("    {}", scenario.description);
        if let Some(defaults) = scenario.executor.default_configuration() {
            println!("    defaults: {}", serde_json::to_string(&defaults)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_options() {
        assert_eq!(
            parse_key_value("timers=5").unwrap(),
            ("timers".to_string(), "5".to_string())
        );
        assert_eq!(
            parse_key_value("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("timers").is_err());
        assert!(parse_key_value("=5").is_err());
    }

    #[test]
    fn cli_rejects_iterations_with_duration() {
        let parsed = Cli::try_parse_from([
            "loadgen",
            "run-scenario",
            "--scenario",
            "echo-once",
            "--iterations",
            "3",
            "--duration",
            "10s",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_parses_run_scenario() {
        let cli = Cli::try_parse_from([
            "loadgen",
            "run-scenario",
            "-s",
            "throughput_stress",
            "--duration",
            "1m30s",
            "--option",
            "timers=4",
        ])
        .unwrap();
        match cli.command {
            Commands::RunScenario {
                scenario,
                duration,
                options,
                ..
            } => {
                assert_eq!(scenario, "throughput_stress");
                assert_eq!(duration, Some(Duration::from_secs(90)));
                assert_eq!(options, vec![("timers".to_string(), "4".to_string())]);
            }
            Commands::ListScenarios => panic!("Expected run-scenario"),
        }
    }
}
