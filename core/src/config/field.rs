//! Type-coercing field initializer.
//!
//! Every configuration value passes through [`init_field`]: the raw string is
//! coerced to the key's declared type, the canonical form is written back to
//! the [`ConfigStore`], and the typed [`Setting`] is handed to a setter.

use crate::config::store::ConfigStore;
use crate::domain::{Key, ValueKind};
use crate::error::Result;

/// A value that could not be coerced to its key's declared type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {expected} value for {key}: {value:?}")]
pub struct ValidationError {
    pub key: Key,
    pub value: String,
    pub expected: ValueKind,
}

/// A typed configuration value, one variant per [`Key`].
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    Server(String),
    Pac(String),
    PacEncoding(String),
    Port(i64),
    Listen(String),
    Gateway(i64),
    Hostonly(i64),
    Allow(String),
    Noproxy(String),
    Useragent(String),
    Username(String),
    Auth(String),
    Workers(i64),
    Threads(i64),
    Idle(i64),
    Socktimeout(f64),
    Proxyreload(i64),
    Foreground(i64),
    Log(i64),
}

impl Setting {
    /// Coerce `raw` to the type `key` declares.
    pub fn parse(key: Key, raw: &str) -> std::result::Result<Self, ValidationError> {
        let invalid = || ValidationError {
            key,
            value: raw.to_string(),
            expected: key.kind(),
        };
        let int = || parse_int(raw).ok_or_else(invalid);
        let text = || raw.to_string();

        let setting = match key {
            Key::Server => Setting::Server(text()),
            Key::Pac => Setting::Pac(text()),
            Key::PacEncoding => Setting::PacEncoding(text()),
            Key::Port => Setting::Port(int()?),
            Key::Listen => Setting::Listen(text()),
            Key::Gateway => Setting::Gateway(int()?),
            Key::Hostonly => Setting::Hostonly(int()?),
            Key::Allow => Setting::Allow(text()),
            Key::Noproxy => Setting::Noproxy(text()),
            Key::Useragent => Setting::Useragent(text()),
            Key::Username => Setting::Username(text()),
            Key::Auth => Setting::Auth(text()),
            Key::Workers => Setting::Workers(int()?),
            Key::Threads => Setting::Threads(int()?),
            Key::Idle => Setting::Idle(int()?),
            Key::Socktimeout => Setting::Socktimeout(parse_float(raw).ok_or_else(invalid)?),
            Key::Proxyreload => Setting::Proxyreload(int()?),
            Key::Foreground => Setting::Foreground(int()?),
            Key::Log => Setting::Log(int()?),
        };
        Ok(setting)
    }

    pub fn key(&self) -> Key {
        match self {
            Setting::Server(_) => Key::Server,
            Setting::Pac(_) => Key::Pac,
            Setting::PacEncoding(_) => Key::PacEncoding,
            Setting::Port(_) => Key::Port,
            Setting::Listen(_) => Key::Listen,
            Setting::Gateway(_) => Key::Gateway,
            Setting::Hostonly(_) => Key::Hostonly,
            Setting::Allow(_) => Key::Allow,
            Setting::Noproxy(_) => Key::Noproxy,
            Setting::Useragent(_) => Key::Useragent,
            Setting::Username(_) => Key::Username,
            Setting::Auth(_) => Key::Auth,
            Setting::Workers(_) => Key::Workers,
            Setting::Threads(_) => Key::Threads,
            Setting::Idle(_) => Key::Idle,
            Setting::Socktimeout(_) => Key::Socktimeout,
            Setting::Proxyreload(_) => Key::Proxyreload,
            Setting::Foreground(_) => Key::Foreground,
            Setting::Log(_) => Key::Log,
        }
    }

    /// Normalized string form written back to the store.
    pub fn canonical(&self) -> String {
        match self {
            Setting::Server(s)
            | Setting::Pac(s)
            | Setting::PacEncoding(s)
            | Setting::Listen(s)
            | Setting::Allow(s)
            | Setting::Noproxy(s)
            | Setting::Useragent(s)
            | Setting::Username(s)
            | Setting::Auth(s) => s.clone(),
            Setting::Port(n)
            | Setting::Gateway(n)
            | Setting::Hostonly(n)
            | Setting::Workers(n)
            | Setting::Threads(n)
            | Setting::Idle(n)
            | Setting::Proxyreload(n)
            | Setting::Foreground(n)
            | Setting::Log(n) => n.to_string(),
            Setting::Socktimeout(f) => format_float(*f),
        }
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    raw.trim().replace('_', "").parse().ok()
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.trim()
        .replace('_', "")
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
}

/// Floats always carry a fractional part: `20` becomes `20.0`.
pub fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Initialize one field.
///
/// Without `override_value`, an existing store value wins over `value`,
/// which then only acts as the default. With it, `value` replaces whatever
/// the store holds. A value that fails coercion is reported and replaced by
/// the value the store already holds, or by the key's documented default
/// when that is missing or invalid too. Only errors from `apply` are fatal.
pub fn init_field<F>(
    store: &mut ConfigStore,
    key: Key,
    value: &str,
    override_value: bool,
    apply: F,
) -> Result<Option<ValidationError>>
where
    F: FnOnce(Setting) -> Result<()>,
{
    let raw = match store.get(key) {
        Some(existing) if !override_value => existing.trim().to_string(),
        _ => value.to_string(),
    };

    let (setting, warning) = match Setting::parse(key, &raw) {
        Ok(setting) => (setting, None),
        Err(err) => {
            tracing::warn!(%key, value = %raw, "{}", err);
            let fallback = match store.get(key).map(|v| Setting::parse(key, v.trim())) {
                Some(Ok(current)) => current,
                _ => Setting::parse(key, key.default_value())?,
            };
            (fallback, Some(err))
        }
    };

    store.set(key, setting.canonical());
    apply(setting)?;
    Ok(warning)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: Setting) -> Result<()> {
        Ok(())
    }

    #[test]
    fn test_parse_typed() {
        assert_eq!(Setting::parse(Key::Port, " 3129 ").unwrap(), Setting::Port(3129));
        assert_eq!(Setting::parse(Key::Socktimeout, "5").unwrap(), Setting::Socktimeout(5.0));
        assert_eq!(
            Setting::parse(Key::Username, "CORP\\bob").unwrap(),
            Setting::Username("CORP\\bob".into())
        );

        let err = Setting::parse(Key::Workers, "many").unwrap_err();
        assert_eq!(err.key, Key::Workers);
        assert_eq!(err.to_string(), "Invalid integer value for settings:workers: \"many\"");
        assert!(Setting::parse(Key::Socktimeout, "inf").is_err());
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(20.0), "20.0");
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(0.0), "0.0");
    }

    #[test]
    fn test_store_value_wins_without_override() {
        let mut store = ConfigStore::parse("[proxy]\nport = 3129\n");
        let mut seen = None;
        init_field(&mut store, Key::Port, "3128", false, |s| {
            seen = Some(s);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, Some(Setting::Port(3129)));
        assert_eq!(store.get(Key::Port), Some("3129"));
    }

    #[test]
    fn test_override_replaces_store_value() {
        let mut store = ConfigStore::parse("[proxy]\nport = 3129\n");
        init_field(&mut store, Key::Port, "4000", true, noop).unwrap();
        assert_eq!(store.get(Key::Port), Some("4000"));
    }

    #[test]
    fn test_float_written_back_normalized() {
        let mut store = ConfigStore::new();
        init_field(&mut store, Key::Socktimeout, "20", true, noop).unwrap();
        assert_eq!(store.get(Key::Socktimeout), Some("20.0"));
    }

    #[test]
    fn test_invalid_value_falls_back_to_default() {
        let mut store = ConfigStore::parse("[settings]\nthreads = lots\n");
        let mut seen = None;
        let warning = init_field(&mut store, Key::Threads, "32", false, |s| {
            seen = Some(s);
            Ok(())
        })
        .unwrap();

        let warning = warning.expect("validation warning");
        assert_eq!(warning.value, "lots");
        assert_eq!(seen, Some(Setting::Threads(32)));
        assert_eq!(store.get(Key::Threads), Some("32"));
    }

    #[test]
    fn test_invalid_override_keeps_current_value() {
        let mut store = ConfigStore::parse("[proxy]\nport = 1111\n");
        let mut seen = None;
        let warning = init_field(&mut store, Key::Port, "abc", true, |s| {
            seen = Some(s);
            Ok(())
        })
        .unwrap();

        assert_eq!(warning.map(|w| w.value), Some("abc".to_string()));
        assert_eq!(seen, Some(Setting::Port(1111)));
        assert_eq!(store.get(Key::Port), Some("1111"));
    }

    #[test]
    fn test_invalid_override_without_current_uses_default() {
        let mut store = ConfigStore::new();
        let mut seen = None;
        init_field(&mut store, Key::Idle, "soon", true, |s| {
            seen = Some(s);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, Some(Setting::Idle(30)));
    }

    #[test]
    fn test_apply_error_is_fatal() {
        let mut store = ConfigStore::new();
        let result = init_field(&mut store, Key::Auth, "KERBEROS", true, |_| {
            Err(crate::error::Error::UnsupportedAuth("KERBEROS".into()))
        });
        assert!(result.is_err());
    }
}
