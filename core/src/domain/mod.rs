//! Domain layer - Pure types, tables and predicates.
//!
//! This module contains the configuration key table, proxy source model,
//! rule sets and process identity matching. These types have no I/O
//! dependencies and can be tested in isolation.

mod auth;
mod key;
mod process;
mod proxy;
mod rules;

// Re-export all domain types
pub use auth::AuthScheme;
pub use key::{is_wide_open_allow, Key, Section, ValueKind, WIDE_OPEN_ALLOW};
pub use process::{
    descendants, is_sibling, normalize_exe_path, LaunchMode, Platform, ProcessRecord,
    SelfIdentity, PROGRAM_NAME,
};
pub use proxy::{parse_servers, ProxyMode, ProxySource, ServerAddr, DEFAULT_PROXY_PORT};
pub use rules::{HostRule, IpRule, RuleSet};
