//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the collaborators the core drives but does not
//! implement itself. Implementations live in `adapters`; tests inject mocks.

mod credentials;
mod discovery;
mod process;
mod service;

pub use credentials::CredentialStore;
pub use discovery::ProxyDiscovery;
pub use process::ProcessTable;
pub use service::ServiceInstaller;
