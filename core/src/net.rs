//! Process-wide socket defaults and the upstream transport handle.

use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::domain::AuthScheme;

/// Default socket timeout in microseconds; zero means blocking.
static DEFAULT_TIMEOUT_US: AtomicU64 = AtomicU64::new(0);

/// Set the default timeout applied to every new socket.
pub fn set_default_timeout(timeout: Duration) {
    let micros = u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX);
    DEFAULT_TIMEOUT_US.store(micros, Ordering::Relaxed);
}

/// Current default socket timeout, `None` when sockets block forever.
pub fn default_timeout() -> Option<Duration> {
    match DEFAULT_TIMEOUT_US.load(Ordering::Relaxed) {
        0 => None,
        micros => Some(Duration::from_micros(micros)),
    }
}

/// Upstream connection parameters shared by all workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transport {
    auth: AuthScheme,
    username: String,
    useragent: String,
    timeout: Option<Duration>,
}

impl Transport {
    pub fn new(auth: AuthScheme, username: impl Into<String>, useragent: impl Into<String>) -> Self {
        Self {
            auth,
            username: username.into(),
            useragent: useragent.into(),
            timeout: default_timeout(),
        }
    }

    /// Override the socket timeout captured at construction.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn auth(&self) -> AuthScheme {
        self.auth
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn useragent(&self) -> &str {
        &self.useragent
    }

    /// Whether credentials will be sent to the upstream.
    pub fn authenticates(&self) -> bool {
        self.auth != AuthScheme::None && !self.username.is_empty()
    }

    /// Apply the socket timeout to a connected stream.
    pub fn configure(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_transport_auth() {
        let transport = Transport::new(AuthScheme::Ntlm, "CORP\\bob", "");
        assert!(transport.authenticates());
        assert!(!Transport::new(AuthScheme::None, "CORP\\bob", "").authenticates());
        assert!(!Transport::new(AuthScheme::Any, "", "").authenticates());
    }

    #[test]
    fn test_configure_applies_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        Transport::new(AuthScheme::Any, "", "")
            .with_timeout(Some(Duration::from_millis(2500)))
            .configure(&stream)
            .unwrap();
        assert_eq!(stream.read_timeout().unwrap(), Some(Duration::from_millis(2500)));
    }
}
