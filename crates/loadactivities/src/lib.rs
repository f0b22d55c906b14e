//! Standard activity library
//!
//! The activities every kitchen-sink worker registers

mod echo;
mod noop;
mod time;

pub use echo::{EchoActivity, ECHO_ACTIVITY};
pub use noop::{NoopActivity, NOOP_ACTIVITY};
pub use time::{DelayActivity, DELAY_ACTIVITY};
use loadruntime::ActivityRegistry;

use std::sync::Arc;

/// Register all standard activities with a registry
pub fn register_all(registry: &mut ActivityRegistry) {
    registry.register_with_metadata(Arc::new(NoopActivity), NoopActivity::metadata());
    registry.register_with_metadata(Arc::new(EchoActivity), EchoActivity::metadata());
    registry.register_with_metadata(Arc::new(DelayActivity), DelayActivity::metadata());
}
