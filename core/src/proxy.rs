//! Upstream proxy selection and throttled refresh.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::domain::{parse_servers, ProxyMode, ProxySource, RuleSet, ServerAddr};
use crate::ports::ProxyDiscovery;
use crate::state::RuntimeState;

/// Shared handle to the active proxy source.
///
/// Safe to use from many worker threads. In [`ProxyMode::Auto`] the source
/// is re-detected at most once per reload interval.
pub struct ProxyHandle {
    mode: ProxyMode,
    noproxy: RuleSet,
    reload_interval: Duration,
    discovery: Arc<dyn ProxyDiscovery>,
    current: Mutex<ProxySource>,
}

impl std::fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("mode", &self.mode)
            .field("reload_interval", &self.reload_interval)
            .field("current", &*self.current.lock())
            .finish()
    }
}

impl ProxyHandle {
    /// Pick the source: explicit servers, then a PAC location, then OS
    /// auto-detection.
    pub fn select(state: &RuntimeState, discovery: Arc<dyn ProxyDiscovery>) -> Self {
        Self::with_interval(state, discovery, state.proxyreload())
    }

    pub fn with_interval(
        state: &RuntimeState,
        discovery: Arc<dyn ProxyDiscovery>,
        reload_interval: Duration,
    ) -> Self {
        let servers = parse_servers(state.server());
        let source = if !servers.is_empty() {
            tracing::debug!(count = servers.len(), "Using configured proxy servers");
            ProxySource::ExplicitServers(servers)
        } else if let Some(pac) = state.pac() {
            tracing::debug!(pac, "Using configured PAC");
            ProxySource::Pac {
                location: pac.to_string(),
                encoding: state.pac_encoding().to_string(),
            }
        } else {
            tracing::debug!("Auto-detecting proxy settings");
            ProxySource::AutoDetect {
                servers: detect_or_direct(discovery.as_ref(), &[]),
                resolved_at: Instant::now(),
            }
        };

        Self {
            mode: source.mode(),
            noproxy: state.noproxy().clone(),
            reload_interval,
            discovery,
            current: Mutex::new(source),
        }
    }

    pub fn mode(&self) -> ProxyMode {
        self.mode
    }

    pub fn reload_interval(&self) -> Duration {
        self.reload_interval
    }

    /// Snapshot of the current source.
    pub fn current(&self) -> ProxySource {
        self.current.lock().clone()
    }

    /// Whether `host` bypasses the upstream proxy.
    pub fn bypass(&self, host: &str) -> bool {
        self.noproxy.matches(host)
    }

    /// Re-detect the OS proxy if the last resolution is older than the
    /// reload interval. Returns the source in effect afterwards.
    ///
    /// Concurrent callers are serialized; at most one re-detection happens
    /// per interval.
    pub fn refresh(&self) -> ProxySource {
        let mut current = self.current.lock();
        if self.mode != ProxyMode::Auto {
            return current.clone();
        }

        if let Some(resolved_at) = current.resolved_at() {
            if resolved_at.elapsed() < self.reload_interval {
                return current.clone();
            }
        }

        tracing::debug!("Refreshing proxy settings");
        let servers = detect_or_direct(self.discovery.as_ref(), current.servers());
        *current = ProxySource::AutoDetect {
            servers,
            resolved_at: Instant::now(),
        };
        current.clone()
    }
}

/// Detected servers, or `fallback` when detection fails. An empty list
/// means a direct connection.
fn detect_or_direct(discovery: &dyn ProxyDiscovery, fallback: &[ServerAddr]) -> Vec<ServerAddr> {
    match discovery.detect() {
        Ok(servers) => servers,
        Err(e) => {
            tracing::warn!(error = %e, "Proxy auto-detection failed");
            fallback.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostContext;
    use crate::error::{Error, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[derive(Default)]
    struct CountingDiscovery {
        calls: AtomicUsize,
        fail: bool,
    }

    impl ProxyDiscovery for CountingDiscovery {
        fn detect(&self) -> Result<Vec<ServerAddr>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Discovery("offline".into()));
            }
            Ok(vec![ServerAddr::new(format!("proxy{}", n), 8080)])
        }
    }

    fn state() -> RuntimeState {
        RuntimeState::new(HostContext::new("/work", "/opt/px"))
    }

    #[test]
    fn test_select_priority() {
        let discovery = Arc::new(CountingDiscovery::default());

        let mut s = state();
        s.set_server("a:1,b:2");
        s.set_pac("http://wpad/wpad.dat").unwrap();
        let handle = ProxyHandle::select(&s, discovery.clone());
        assert_eq!(handle.mode(), ProxyMode::Config);

        s.set_server("");
        let handle = ProxyHandle::select(&s, discovery.clone());
        assert_eq!(handle.mode(), ProxyMode::ConfigPac);

        s.set_pac("").unwrap();
        let handle = ProxyHandle::select(&s, discovery.clone());
        assert_eq!(handle.mode(), ProxyMode::Auto);
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_noop_outside_auto() {
        let discovery = Arc::new(CountingDiscovery::default());
        let mut s = state();
        s.set_server("a:1");
        let handle = ProxyHandle::with_interval(&s, discovery.clone(), Duration::ZERO);

        assert_eq!(handle.refresh(), ProxySource::ExplicitServers(vec![ServerAddr::new("a", 1)]));
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_refresh_within_interval_keeps_timestamp() {
        let discovery = Arc::new(CountingDiscovery::default());
        let handle = ProxyHandle::with_interval(&state(), discovery.clone(), Duration::from_secs(60));
        let before = handle.current().resolved_at();

        let after = handle.refresh().resolved_at();
        assert_eq!(before, after);
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_after_interval_restamps() {
        let discovery = Arc::new(CountingDiscovery::default());
        let handle =
            ProxyHandle::with_interval(&state(), discovery.clone(), Duration::from_millis(20));
        let before = handle.current().resolved_at().unwrap();

        thread::sleep(Duration::from_millis(40));
        let refreshed = handle.refresh();
        assert!(refreshed.resolved_at().unwrap() > before);
        assert_eq!(refreshed.servers(), [ServerAddr::new("proxy1", 8080)]);
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_refresh_detects_once() {
        let discovery = Arc::new(CountingDiscovery::default());
        let handle = Arc::new(ProxyHandle::with_interval(
            &state(),
            discovery.clone(),
            Duration::from_millis(200),
        ));
        thread::sleep(Duration::from_millis(250));

        let barrier = Arc::new(Barrier::new(8));
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    handle.refresh()
                })
            })
            .collect();
        let results: Vec<ProxySource> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        // One detection at startup, one for the whole herd.
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 2);
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_failed_detection_keeps_servers() {
        let discovery = Arc::new(CountingDiscovery {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let handle = ProxyHandle::with_interval(&state(), discovery, Duration::ZERO);
        assert!(handle.current().servers().is_empty());
        let before = handle.current().resolved_at().unwrap();
        assert!(handle.refresh().resolved_at().unwrap() >= before);
    }

    #[test]
    fn test_bypass() {
        let mut s = state();
        s.set_noproxy("localhost, 10.*.*.*").unwrap();
        let handle = ProxyHandle::select(&s, Arc::new(CountingDiscovery::default()));
        assert!(handle.bypass("10.1.2.3"));
        assert!(handle.bypass("localhost"));
        assert!(!handle.bypass("example.com"));
    }
}
