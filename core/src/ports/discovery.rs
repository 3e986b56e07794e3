//! Proxy auto-detection port (interface).

use crate::domain::ServerAddr;
use crate::error::Result;

/// Port for querying the OS for its current proxy configuration.
///
/// Called once at startup and again whenever a refresh is due, so
/// implementations should be cheap enough to run every few minutes.
pub trait ProxyDiscovery: Send + Sync {
    /// Resolve the upstream proxies the OS currently advertises.
    ///
    /// An empty list means "connect directly".
    fn detect(&self) -> Result<Vec<ServerAddr>>;
}
