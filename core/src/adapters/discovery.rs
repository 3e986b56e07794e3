//! OS proxy auto-detection.
//!
//! - All platforms: `https_proxy` / `http_proxy` environment variables
//! - macOS: `scutil --proxy`
//! - Windows: the per-user Internet Settings registry key
//!
//! PAC-only OS configurations (WPAD, AutoConfigURL) are reported as a direct
//! connection; evaluating them belongs to the transport layer.

use std::process::{Command, Stdio};

use regex::Regex;

use crate::domain::{parse_servers, ServerAddr};
use crate::error::{Error, Result};
use crate::ports::ProxyDiscovery;

/// Environment variables consulted, most specific first.
const PROXY_ENV_VARS: [&str; 4] = ["https_proxy", "HTTPS_PROXY", "http_proxy", "HTTP_PROXY"];

/// Proxy discovery backed by the running OS.
#[derive(Debug, Default)]
pub struct SystemProxyDiscovery;

impl SystemProxyDiscovery {
    pub fn new() -> Self {
        Self
    }

    #[cfg(target_os = "macos")]
    fn detect_os(&self) -> Result<Vec<ServerAddr>> {
        let output = run("scutil", &["--proxy"])?;
        Ok(parse_scutil(&output))
    }

    #[cfg(target_os = "windows")]
    fn detect_os(&self) -> Result<Vec<ServerAddr>> {
        let output = run(
            "reg",
            &[
                "query",
                r"HKCU\Software\Microsoft\Windows\CurrentVersion\Internet Settings",
            ],
        )?;
        Ok(parse_internet_settings(&output))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    fn detect_os(&self) -> Result<Vec<ServerAddr>> {
        Ok(Vec::new())
    }
}

impl ProxyDiscovery for SystemProxyDiscovery {
    fn detect(&self) -> Result<Vec<ServerAddr>> {
        let servers = from_env(|name| std::env::var(name).ok());
        if !servers.is_empty() {
            tracing::debug!(count = servers.len(), "Proxy servers from environment");
            return Ok(servers);
        }

        let servers = self.detect_os()?;
        tracing::debug!(count = servers.len(), "Proxy servers from OS settings");
        Ok(servers)
    }
}

#[cfg_attr(not(any(target_os = "macos", target_os = "windows")), allow(dead_code))]
fn run(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| Error::Discovery(format!("{}: {}", program, e)))?;

    if !output.status.success() {
        return Err(Error::Discovery(format!(
            "{} exited with {}",
            program, output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Servers from the first non-empty proxy environment variable.
fn from_env(var: impl Fn(&str) -> Option<String>) -> Vec<ServerAddr> {
    PROXY_ENV_VARS
        .iter()
        .filter_map(|name| var(name))
        .find(|value| !value.trim().is_empty())
        .map(|value| parse_servers(&value))
        .unwrap_or_default()
}

/// Parse `scutil --proxy` output, HTTPS before HTTP.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_scutil(output: &str) -> Vec<ServerAddr> {
    let field = |name: &str| -> Option<String> {
        let re = Regex::new(&format!(r"(?m)^\s*{}\s*:\s*(\S+)\s*$", name)).ok()?;
        re.captures(output).map(|c| c[1].to_string())
    };

    let mut servers = Vec::new();
    for proto in ["HTTPS", "HTTP"] {
        if field(&format!("{}Enable", proto)).as_deref() != Some("1") {
            continue;
        }
        let Some(host) = field(&format!("{}Proxy", proto)) else {
            continue;
        };
        let port = field(&format!("{}Port", proto))
            .and_then(|p| p.parse().ok())
            .unwrap_or(crate::domain::DEFAULT_PROXY_PORT);
        let addr = ServerAddr::new(host, port);
        if !servers.contains(&addr) {
            servers.push(addr);
        }
    }
    servers
}

/// Parse `reg query` output of the Internet Settings key.
///
/// `ProxyServer` is either `host:port` or `http=h:p;https=h:p`.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn parse_internet_settings(output: &str) -> Vec<ServerAddr> {
    let value = |name: &str| -> Option<String> {
        let re = Regex::new(&format!(r"(?m)^\s*{}\s+REG_\w+\s+(.*?)\s*$", name)).ok()?;
        re.captures(output).map(|c| c[1].to_string())
    };

    let enabled = value("ProxyEnable")
        .map(|v| v.trim_start_matches("0x") != "0")
        .unwrap_or(false);
    if !enabled {
        return Vec::new();
    }

    let Some(server) = value("ProxyServer") else {
        return Vec::new();
    };

    let entries: Vec<&str> = server
        .split(';')
        .filter_map(|entry| match entry.split_once('=') {
            Some((proto, addr)) if proto.eq_ignore_ascii_case("https") => Some(addr),
            Some((proto, addr)) if proto.eq_ignore_ascii_case("http") => Some(addr),
            Some(_) => None,
            None => Some(entry),
        })
        .collect();
    parse_servers(&entries.join(","))
}
