//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with the running OS.

pub mod credentials;
pub mod discovery;
pub mod process;
pub mod service;

// Re-export main types for convenience
pub use credentials::SystemCredentialStore;
pub use discovery::SystemProxyDiscovery;
pub use process::SystemProcessTable;
pub use service::SystemServiceInstaller;
