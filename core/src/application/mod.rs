//! Application layer - Use case services.
//!
//! Services are thin orchestrators that:
//! - Accept resolved state and domain types as inputs
//! - Use ports (traits) for external dependencies
//! - Report progress through plain writers so tests can capture it

pub mod actions;
mod lifecycle;
mod runtime;

pub use lifecycle::{LifecycleService, DEFAULT_SETTLE};
pub use runtime::Runtime;
