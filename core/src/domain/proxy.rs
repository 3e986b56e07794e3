//! Proxy source domain model.

use std::fmt;
use std::time::Instant;

use url::Url;

/// An upstream proxy `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
}

/// Port assumed when a server entry has none.
pub const DEFAULT_PROXY_PORT: u16 = 80;

impl ServerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port` or `scheme://host:port/`.
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        let url = if entry.contains("://") {
            Url::parse(entry).ok()?
        } else {
            Url::parse(&format!("http://{}", entry)).ok()?
        };

        let host = url.host_str()?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return None;
        }
        let port = url.port_or_known_default().unwrap_or(DEFAULT_PROXY_PORT);
        Some(Self::new(host, port))
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Parse a comma or semicolon separated server list, dropping duplicates and
/// malformed entries.
pub fn parse_servers(servers: &str) -> Vec<ServerAddr> {
    let mut parsed: Vec<ServerAddr> = Vec::new();
    for entry in servers.split([',', ';']) {
        match ServerAddr::parse(entry) {
            Some(addr) if !parsed.contains(&addr) => parsed.push(addr),
            Some(_) => {}
            None if entry.trim().is_empty() => {}
            None => tracing::debug!(entry = entry.trim(), "Ignoring malformed proxy server"),
        }
    }
    parsed
}

/// How the proxy source was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    /// Explicit `server` list.
    Config,
    /// Explicit `pac` location.
    ConfigPac,
    /// Live OS detection, refreshable.
    Auto,
}

/// Where upstream proxy information comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxySource {
    ExplicitServers(Vec<ServerAddr>),
    Pac { location: String, encoding: String },
    AutoDetect {
        servers: Vec<ServerAddr>,
        resolved_at: Instant,
    },
}

impl ProxySource {
    pub fn mode(&self) -> ProxyMode {
        match self {
            ProxySource::ExplicitServers(_) => ProxyMode::Config,
            ProxySource::Pac { .. } => ProxyMode::ConfigPac,
            ProxySource::AutoDetect { .. } => ProxyMode::Auto,
        }
    }

    /// Time of the last OS resolution, for auto-detected sources.
    pub fn resolved_at(&self) -> Option<Instant> {
        match self {
            ProxySource::AutoDetect { resolved_at, .. } => Some(*resolved_at),
            _ => None,
        }
    }

    /// Upstream servers known without evaluating a PAC script.
    pub fn servers(&self) -> &[ServerAddr] {
        match self {
            ProxySource::ExplicitServers(servers) | ProxySource::AutoDetect { servers, .. } => {
                servers
            }
            ProxySource::Pac { .. } => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_forms() {
        assert_eq!(ServerAddr::parse("proxy:8080"), Some(ServerAddr::new("proxy", 8080)));
        assert_eq!(ServerAddr::parse("proxy"), Some(ServerAddr::new("proxy", 80)));
        assert_eq!(
            ServerAddr::parse("http://proxy.corp:3128/"),
            Some(ServerAddr::new("proxy.corp", 3128))
        );
        assert_eq!(ServerAddr::parse("[::1]:3128"), Some(ServerAddr::new("::1", 3128)));
        assert_eq!(ServerAddr::parse("proxy:notaport"), None);
        assert_eq!(ServerAddr::parse(":80"), None);
        assert_eq!(
            ServerAddr::parse("https://Proxy.Corp"),
            Some(ServerAddr::new("proxy.corp", 443))
        );
    }

    #[test]
    fn test_parse_server_list_dedups() {
        let servers = parse_servers("a:1, b:2;a:1,,");
        assert_eq!(servers, vec![ServerAddr::new("a", 1), ServerAddr::new("b", 2)]);
        assert!(parse_servers("").is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(ServerAddr::new("proxy", 8080).to_string(), "proxy:8080");
        assert_eq!(ServerAddr::new("::1", 3128).to_string(), "[::1]:3128");
    }

    #[test]
    fn test_mode() {
        let src = ProxySource::Pac {
            location: "http://wpad/wpad.dat".into(),
            encoding: "utf-8".into(),
        };
        assert_eq!(src.mode(), ProxyMode::ConfigPac);
        assert!(src.resolved_at().is_none());
        assert!(src.servers().is_empty());
    }
}
