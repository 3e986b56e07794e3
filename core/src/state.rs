//! Resolved runtime state.
//!
//! [`RuntimeState`] holds the typed, validated form of every setting. It is
//! only mutated through its setters, which the resolver drives via
//! [`RuntimeState::apply`].

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::config::{HostContext, Setting};
use crate::domain::{AuthScheme, Key, Platform, RuleSet};
use crate::error::{Error, Result};
use crate::net;
use crate::observability::{self, LogDestination, LogLocation};

/// Listen address used when none is configured.
pub const DEFAULT_LISTEN: &str = "127.0.0.1";

/// Typed runtime settings.
#[derive(Debug, Clone)]
pub struct RuntimeState {
    host: HostContext,
    server: String,
    pac: Option<String>,
    pac_encoding: String,
    port: u16,
    listen: Vec<String>,
    gateway: bool,
    hostonly: bool,
    allow: RuleSet,
    noproxy: RuleSet,
    noproxy_raw: String,
    useragent: String,
    username: String,
    auth: AuthScheme,
    workers: u32,
    threads: u32,
    idle: Duration,
    socktimeout: Duration,
    proxyreload: Duration,
    foreground: bool,
    log: LogLocation,
    logger: Option<LogDestination>,
}

impl RuntimeState {
    /// State before any setting has been applied.
    pub fn new(host: HostContext) -> Self {
        Self {
            host,
            server: String::new(),
            pac: None,
            pac_encoding: "utf-8".to_string(),
            port: 3128,
            listen: vec![DEFAULT_LISTEN.to_string()],
            gateway: false,
            hostonly: false,
            allow: RuleSet::default(),
            noproxy: RuleSet::default(),
            noproxy_raw: String::new(),
            useragent: String::new(),
            username: String::new(),
            auth: AuthScheme::Any,
            workers: 2,
            threads: 32,
            idle: Duration::from_secs(30),
            socktimeout: Duration::from_secs(20),
            proxyreload: Duration::from_secs(60),
            foreground: false,
            log: LogLocation::None,
            logger: None,
        }
    }

    /// Route a typed setting to its setter.
    pub fn apply(&mut self, setting: Setting) -> Result<()> {
        match setting {
            Setting::Server(v) => self.set_server(&v),
            Setting::Pac(v) => self.set_pac(&v)?,
            Setting::PacEncoding(v) => self.pac_encoding = v,
            Setting::Port(v) => self.set_port(v),
            Setting::Listen(v) => self.set_listen(&v),
            Setting::Gateway(v) => self.gateway = v == 1,
            Setting::Hostonly(v) => self.hostonly = v == 1,
            Setting::Allow(v) => self.set_allow(&v)?,
            Setting::Noproxy(v) => self.set_noproxy(&v)?,
            Setting::Useragent(v) => self.useragent = v,
            Setting::Username(v) => self.username = v,
            Setting::Auth(v) => self.set_auth(&v)?,
            Setting::Workers(v) => self.workers = positive(Key::Workers, v, 2),
            Setting::Threads(v) => self.threads = positive(Key::Threads, v, 32),
            Setting::Idle(v) => self.idle = seconds(v),
            Setting::Socktimeout(v) => self.set_socktimeout(v),
            Setting::Proxyreload(v) => self.proxyreload = seconds(v),
            Setting::Foreground(v) => self.foreground = v == 1,
            Setting::Log(v) => self.set_log(v),
        }
        Ok(())
    }

    pub fn set_server(&mut self, server: &str) {
        self.server = server.trim().to_string();
    }

    /// Accepts an `http(s)` URL, a `file://` URL or a local path relative
    /// to the install directory. Local files must exist.
    pub fn set_pac(&mut self, pac: &str) -> Result<()> {
        let pac = pac.trim();
        if pac.is_empty() {
            self.pac = None;
            return Ok(());
        }

        let lower = pac.to_ascii_lowercase();
        if lower.starts_with("http") {
            self.pac = Some(pac.to_string());
            return Ok(());
        }

        let path = if lower.starts_with("file:") {
            file_url_to_path(pac, Platform::current())
                .ok_or_else(|| Error::InvalidPac(pac.to_string()))?
        } else {
            let path = PathBuf::from(pac);
            if path.is_absolute() {
                path
            } else {
                self.host.install_dir.join(path)
            }
        };

        if !path.is_file() {
            return Err(Error::InvalidPac(pac.to_string()));
        }
        self.pac = Some(path.to_string_lossy().into_owned());
        Ok(())
    }

    pub fn set_port(&mut self, port: i64) {
        self.port = match u16::try_from(port) {
            Ok(port) if port != 0 => port,
            _ => {
                tracing::warn!(port, "Port out of range, using 3128");
                3128
            }
        };
    }

    /// Comma separated interfaces; empty means loopback only.
    pub fn set_listen(&mut self, listen: &str) {
        let mut addrs: Vec<String> = Vec::new();
        for addr in listen.split(',').map(str::trim).filter(|a| !a.is_empty()) {
            if !addrs.iter().any(|a| a == addr) {
                addrs.push(addr.to_string());
            }
        }
        if addrs.is_empty() {
            addrs.push(DEFAULT_LISTEN.to_string());
        }
        self.listen = addrs;
    }

    /// Listen on all interfaces.
    pub fn listen_on_all(&mut self) {
        self.listen = vec![String::new()];
    }

    pub fn set_allow(&mut self, allow: &str) -> Result<()> {
        self.allow = RuleSet::parse(allow, true)?;
        Ok(())
    }

    pub fn set_noproxy(&mut self, noproxy: &str) -> Result<()> {
        self.noproxy = RuleSet::parse(noproxy, false)?;
        self.noproxy_raw = noproxy.trim().to_string();
        Ok(())
    }

    pub fn set_auth(&mut self, auth: &str) -> Result<()> {
        self.auth = auth.parse()?;
        Ok(())
    }

    pub fn set_socktimeout(&mut self, seconds: f64) {
        self.socktimeout = Duration::try_from_secs_f64(seconds).unwrap_or_else(|_| {
            tracing::warn!(seconds, "Invalid socket timeout, using 20.0");
            Duration::from_secs(20)
        });
        net::set_default_timeout(self.socktimeout);
    }

    fn set_log(&mut self, code: i64) {
        self.log = LogLocation::from_code(code).unwrap_or_else(|| {
            tracing::warn!(code, "Unknown log location, logging disabled");
            LogLocation::None
        });
    }

    /// Attach the debug logger for the configured location.
    ///
    /// Only the first successful call has an effect.
    pub fn set_logger(&mut self) -> Result<()> {
        if self.logger.is_some() {
            return Ok(());
        }
        let Some(destination) =
            observability::log_destination(self.log, &self.host, self.port, Local::now())
        else {
            return Ok(());
        };

        if !observability::install(&destination)? {
            tracing::debug!("Logger already installed for this process");
        }
        self.logger = observability::installed_destination().or(Some(destination));
        Ok(())
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn pac(&self) -> Option<&str> {
        self.pac.as_deref()
    }

    pub fn pac_encoding(&self) -> &str {
        &self.pac_encoding
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn listen(&self) -> &[String] {
        &self.listen
    }

    pub fn gateway(&self) -> bool {
        self.gateway
    }

    pub fn hostonly(&self) -> bool {
        self.hostonly
    }

    pub fn allow(&self) -> &RuleSet {
        &self.allow
    }

    pub fn noproxy(&self) -> &RuleSet {
        &self.noproxy
    }

    pub fn noproxy_raw(&self) -> &str {
        &self.noproxy_raw
    }

    pub fn useragent(&self) -> &str {
        &self.useragent
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn auth(&self) -> AuthScheme {
        self.auth
    }

    pub fn workers(&self) -> u32 {
        self.workers
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }

    pub fn idle(&self) -> Duration {
        self.idle
    }

    pub fn socktimeout(&self) -> Duration {
        self.socktimeout
    }

    pub fn proxyreload(&self) -> Duration {
        self.proxyreload
    }

    pub fn foreground(&self) -> bool {
        self.foreground
    }

    pub fn log(&self) -> LogLocation {
        self.log
    }

    pub fn logger(&self) -> Option<&LogDestination> {
        self.logger.as_ref()
    }
}

fn positive(key: Key, value: i64, default: u32) -> u32 {
    match u32::try_from(value) {
        Ok(v) if v > 0 => v,
        _ => {
            tracing::warn!(%key, value, default, "Value must be positive");
            default
        }
    }
}

fn seconds(value: i64) -> Duration {
    Duration::from_secs(u64::try_from(value).unwrap_or(0))
}

/// Convert a `file:` URL to a local path.
///
/// A drive letter leading the path is kept. On Windows a rooted path with
/// no drive lands on `C:`. URLs naming a remote host are rejected.
pub fn file_url_to_path(url: &str, platform: Platform) -> Option<PathBuf> {
    let url = Url::parse(url).ok()?;
    if url.scheme() != "file" || url.host_str().is_some_and(|h| !h.is_empty()) {
        return None;
    }

    let path = percent_decode_str(url.path()).decode_utf8().ok()?;
    let local = match path.as_bytes() {
        [b'/', drive, b':', ..] if drive.is_ascii_alphabetic() => path[1..].to_string(),
        _ if platform == Platform::Windows => format!("C:{}", path),
        _ => path.into_owned(),
    };
    Some(PathBuf::from(local))
}
