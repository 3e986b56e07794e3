//! Assembled runtime shared by the listener and its workers.

use std::sync::Arc;

use crate::config::{ConfigStore, Resolution};
use crate::domain::ProxySource;
use crate::net::Transport;
use crate::ports::ProxyDiscovery;
use crate::proxy::ProxyHandle;
use crate::state::RuntimeState;

/// Resolved state plus the handles built from it.
///
/// Cheap to clone; every clone shares the same proxy handle.
#[derive(Debug, Clone)]
pub struct Runtime {
    state: Arc<RuntimeState>,
    store: Arc<ConfigStore>,
    proxy: Arc<ProxyHandle>,
    transport: Transport,
}

impl Runtime {
    pub fn new(resolution: Resolution, discovery: Arc<dyn ProxyDiscovery>) -> Self {
        let Resolution { state, store, .. } = resolution;
        let proxy = ProxyHandle::select(&state, discovery);
        let transport = Transport::new(state.auth(), state.username(), state.useragent());

        tracing::info!(
            port = state.port(),
            mode = ?proxy.mode(),
            workers = state.workers(),
            threads = state.threads(),
            "Px runtime ready"
        );

        Self {
            state: Arc::new(state),
            store: Arc::new(store),
            proxy: Arc::new(proxy),
            transport,
        }
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn proxy(&self) -> &ProxyHandle {
        &self.proxy
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Proxy source to use for the next request.
    pub fn upstream(&self) -> ProxySource {
        self.proxy.refresh()
    }
}
