// crates/loadcore/src/events/mod.rs

mod base;

pub use base::{EventBus, EventEmitter, RunEvent};
