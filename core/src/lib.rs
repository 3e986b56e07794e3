//! Px Core Library
//!
//! Configuration and lifecycle core of the Px forwarding proxy agent.
//! Provides functionality to:
//! - Resolve settings from defaults, `px.ini`, `PX_` environment variables
//!   and command-line flags into a typed runtime state
//! - Select the upstream proxy source and refresh OS-detected proxies
//! - Route debug logging to a file or stdout
//! - Find and terminate other running Px instances
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure types, tables and predicates
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: OS implementations of the ports
//! - `application`: Use case services
//!
//! # Platform Support
//! - Linux: `/proc`, Secret Service
//! - macOS: `ps`, `scutil`, keychain
//! - Windows: CIM via PowerShell, `taskkill`, `reg`, Credential Manager

// Hexagonal architecture layers
pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub mod config;
pub mod error;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod state;

// Re-export commonly used types
pub use application::{LifecycleService, Runtime};
pub use config::{resolve, ConfigInputs, ConfigStore, HostContext, Resolution};
pub use domain::{AuthScheme, Key, ProxyMode, ProxySource, SelfIdentity};
pub use error::{Error, Result};
pub use observability::LogLocation;
pub use proxy::ProxyHandle;
pub use state::RuntimeState;
