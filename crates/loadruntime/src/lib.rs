//! Kitchen-sink workflow runtime
//!
//! This crate provides the action interpreter that runs inside one workflow
//! instance, the host capability boundary it issues work through, the
//! client boundary the harness drives workflows with, and an in-process
//! local platform implementing both for tests and smoke runs.

mod awaitable;
mod client;
mod host;
mod instance;
mod interpreter;
pub mod local;
mod registry;

pub use awaitable::{Awaitable, ChildAwaitable};
pub use client::{
    ClientError, StartWorkflowOptions, WorkflowClient, WorkflowDescription, WorkflowExecution,
    WorkflowStatus,
};
pub use host::{ChildHandle, ChildStarted, HostCapabilities, HostFuture, WorkflowHost, WorkflowInfo};
pub use instance::{drive_instance, InstanceMessage, WorkflowOutcome};
pub use interpreter::{ActionResult, KitchenSinkWorkflow};
pub use local::{LocalClient, LocalPlatform, LocalPlatformConfig};
pub use registry::{ActivityMetadata, ActivityRegistry, ArgumentDefinition};
