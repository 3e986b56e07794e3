//! Configuration key table.
//!
//! Every persisted setting is a [`Key`]. Its section, value type and default
//! are fixed here so the resolver can route each key to the right typed
//! initializer without string lookups.

use std::fmt;
use std::str::FromStr;

/// INI section a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// User-facing proxy behavior.
    Proxy,
    /// Operational settings.
    Settings,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::Proxy, Section::Settings];

    pub fn name(self) -> &'static str {
        match self {
            Section::Proxy => "proxy",
            Section::Settings => "settings",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared type of a key's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Int,
    Float,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Str => "string",
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
        })
    }
}

/// A configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    // [proxy]
    Server,
    Pac,
    PacEncoding,
    Port,
    Listen,
    Gateway,
    Hostonly,
    Allow,
    Noproxy,
    Useragent,
    Username,
    Auth,
    // [settings]
    Workers,
    Threads,
    Idle,
    Socktimeout,
    Proxyreload,
    Foreground,
    Log,
}

impl Key {
    /// All keys in default-table order.
    pub const ALL: [Key; 19] = [
        Key::Server,
        Key::Pac,
        Key::PacEncoding,
        Key::Port,
        Key::Listen,
        Key::Gateway,
        Key::Hostonly,
        Key::Allow,
        Key::Noproxy,
        Key::Useragent,
        Key::Username,
        Key::Auth,
        Key::Workers,
        Key::Threads,
        Key::Idle,
        Key::Socktimeout,
        Key::Proxyreload,
        Key::Foreground,
        Key::Log,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Key::Server => "server",
            Key::Pac => "pac",
            Key::PacEncoding => "pac_encoding",
            Key::Port => "port",
            Key::Listen => "listen",
            Key::Gateway => "gateway",
            Key::Hostonly => "hostonly",
            Key::Allow => "allow",
            Key::Noproxy => "noproxy",
            Key::Useragent => "useragent",
            Key::Username => "username",
            Key::Auth => "auth",
            Key::Workers => "workers",
            Key::Threads => "threads",
            Key::Idle => "idle",
            Key::Socktimeout => "socktimeout",
            Key::Proxyreload => "proxyreload",
            Key::Foreground => "foreground",
            Key::Log => "log",
        }
    }

    pub fn section(self) -> Section {
        match self {
            Key::Server
            | Key::Pac
            | Key::PacEncoding
            | Key::Port
            | Key::Listen
            | Key::Gateway
            | Key::Hostonly
            | Key::Allow
            | Key::Noproxy
            | Key::Useragent
            | Key::Username
            | Key::Auth => Section::Proxy,
            Key::Workers
            | Key::Threads
            | Key::Idle
            | Key::Socktimeout
            | Key::Proxyreload
            | Key::Foreground
            | Key::Log => Section::Settings,
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Key::Port
            | Key::Gateway
            | Key::Hostonly
            | Key::Workers
            | Key::Threads
            | Key::Idle
            | Key::Proxyreload
            | Key::Foreground
            | Key::Log => ValueKind::Int,
            Key::Socktimeout => ValueKind::Float,
            _ => ValueKind::Str,
        }
    }

    /// Documented default, in canonical string form.
    pub fn default_value(self) -> &'static str {
        match self {
            Key::Server => "",
            Key::Pac => "",
            Key::PacEncoding => "utf-8",
            Key::Port => "3128",
            Key::Listen => "127.0.0.1",
            Key::Gateway => "0",
            Key::Hostonly => "0",
            Key::Allow => "*.*.*.*",
            Key::Noproxy => "",
            Key::Useragent => "",
            Key::Username => "",
            Key::Auth => "",
            Key::Workers => "2",
            Key::Threads => "32",
            Key::Idle => "30",
            Key::Socktimeout => "20.0",
            Key::Proxyreload => "60",
            Key::Foreground => "0",
            Key::Log => "0",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.section(), self.name())
    }
}

impl FromStr for Key {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim().to_ascii_lowercase();
        Key::ALL.into_iter().find(|k| k.name() == name).ok_or(())
    }
}

/// Allow rules that mean "everyone".
pub const WIDE_OPEN_ALLOW: [&str; 2] = ["*.*.*.*", "0.0.0.0/0"];

pub fn is_wide_open_allow(allow: &str) -> bool {
    WIDE_OPEN_ALLOW.contains(&allow.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_round_trips_by_name() {
        for key in Key::ALL {
            assert_eq!(key.name().parse::<Key>(), Ok(key));
        }
        assert_eq!("SERVER".parse::<Key>(), Ok(Key::Server));
        assert!("proxy".parse::<Key>().is_err());
        assert!("save".parse::<Key>().is_err());
    }

    #[test]
    fn test_sections() {
        assert_eq!(Key::Allow.section(), Section::Proxy);
        assert_eq!(Key::Socktimeout.section(), Section::Settings);
        assert_eq!(Key::Socktimeout.kind(), ValueKind::Float);
        assert_eq!(Key::Gateway.kind(), ValueKind::Int);
        assert_eq!(Key::Username.kind(), ValueKind::Str);
        assert_eq!(Key::Port.to_string(), "proxy:port");
    }

    #[test]
    fn test_wide_open_allow() {
        assert!(is_wide_open_allow("*.*.*.*"));
        assert!(is_wide_open_allow("0.0.0.0/0"));
        assert!(!is_wide_open_allow("10.0.0.0/8"));
    }
}
