//! Configuration - the canonical store, its sources and the resolver.

mod field;
mod host;
mod resolver;
pub mod sources;
mod store;

pub use field::{format_float, init_field, Setting, ValidationError};
pub use host::HostContext;
pub use resolver::{resolve, ConfigInputs, Resolution, ACTION_NAMES};
pub use store::ConfigStore;
