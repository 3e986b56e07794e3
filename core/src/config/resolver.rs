//! Layered configuration resolution.
//!
//! Sources are applied in four passes, each able to override the last:
//! built-in defaults, the config file, `PX_` environment variables and
//! command-line flags. Derived settings (`gateway`, `hostonly`) are then
//! propagated to the final values.

use std::path::PathBuf;

use crate::config::field::{init_field, ValidationError};
use crate::config::host::HostContext;
use crate::config::sources::{self, Pairs};
use crate::config::store::ConfigStore;
use crate::domain::{is_wide_open_allow, Key};
use crate::error::{Error, Result};
use crate::observability::LogLocation;
use crate::state::RuntimeState;

/// Flag and variable names that select actions rather than settings.
pub const ACTION_NAMES: [&str; 11] = [
    "config",
    "save",
    "password",
    "install",
    "uninstall",
    "quit",
    "restart",
    "debug",
    "uniqlog",
    "verbose",
    "help",
];

/// Everything resolution reads.
#[derive(Debug, Clone)]
pub struct ConfigInputs {
    /// Normalized command-line pairs, see [`sources::normalize_flags`].
    pub flags: Pairs,
    /// `PX_` variables with the prefix stripped, see [`sources::gather_env`].
    pub env: Pairs,
    /// Log location forced by a debug flag.
    pub log_override: Option<LogLocation>,
    pub host: HostContext,
}

impl ConfigInputs {
    pub fn new(host: HostContext) -> Self {
        Self {
            flags: Vec::new(),
            env: Vec::new(),
            log_override: None,
            host,
        }
    }

    /// Inputs read from the real process environment.
    pub fn from_process(flags: Pairs, host: HostContext) -> Self {
        let env = sources::gather_env(std::env::vars(), &host.cwd, &host.install_dir);
        Self {
            flags,
            env,
            log_override: None,
            host,
        }
    }

    pub fn with_flags(mut self, flags: Pairs) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_env(mut self, env: Pairs) -> Self {
        self.env = env;
        self
    }

    pub fn with_log_override(mut self, location: LogLocation) -> Self {
        self.log_override = Some(location);
        self
    }

    /// Last value for `name`, command line first.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        sources::lookup(&self.flags, name).or_else(|| sources::lookup(&self.env, name))
    }

    pub fn saving(&self) -> bool {
        self.lookup("save").is_some()
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub state: RuntimeState,
    /// Canonical store, normalized values only.
    pub store: ConfigStore,
    /// Config file read from and saved to.
    pub ini_path: Option<PathBuf>,
    /// Values replaced by their defaults.
    pub warnings: Vec<ValidationError>,
}

impl Resolution {
    /// Write the canonical store to the config file.
    pub fn save(&self) -> Result<PathBuf> {
        let path = self
            .ini_path
            .clone()
            .ok_or_else(|| Error::ConfigNotFound(PathBuf::from(sources::CONFIG_FILE)))?;
        self.store.save(&path)?;
        tracing::info!(path = %path.display(), "Saved config");
        Ok(path)
    }
}

struct Resolver {
    state: RuntimeState,
    store: ConfigStore,
    warnings: Vec<ValidationError>,
}

impl Resolver {
    fn init(&mut self, key: Key, value: &str, override_value: bool) -> Result<()> {
        let state = &mut self.state;
        if let Some(warning) =
            init_field(&mut self.store, key, value, override_value, |s| state.apply(s))?
        {
            self.warnings.push(warning);
        }
        Ok(())
    }

    fn apply_pairs(&mut self, pairs: &[(String, String)], source: &str) -> Result<()> {
        for (name, value) in pairs {
            match name.parse::<Key>() {
                Ok(key) => self.init(key, value, true)?,
                Err(()) if ACTION_NAMES.contains(&name.as_str()) => {}
                Err(()) => tracing::debug!(name = %name, source, "Ignoring unknown setting"),
            }
        }
        Ok(())
    }

    /// Listen and allow rules implied by `gateway` and `hostonly`.
    fn propagate_derived(&mut self) -> Result<()> {
        let allow = self.store.get(Key::Allow).unwrap_or_default().to_string();
        let wide_open = is_wide_open_allow(&allow);

        if self.state.gateway() {
            self.state.listen_on_all();
            self.store.set(Key::Listen, "");
            tracing::debug!("Gateway mode, listening on all interfaces");
            if wide_open {
                tracing::debug!("Gateway mode allows all clients, configure 'allow' to restrict");
            }
        }

        if self.state.hostonly() {
            self.state.listen_on_all();
            self.store.set(Key::Listen, "");
            tracing::debug!("Host-only mode, listening on all interfaces");
            if !self.state.gateway() || wide_open {
                self.init(Key::Allow, "", true)?;
                tracing::debug!("Host-only mode, only local clients allowed");
            }
        }
        Ok(())
    }
}

/// Resolve configuration from `inputs`.
///
/// Fatal misconfigurations return `Err` before anything is started; values
/// of the wrong type are only reported in [`Resolution::warnings`].
pub fn resolve(inputs: &ConfigInputs) -> Result<Resolution> {
    let host = &inputs.host;
    let ini_path = sources::locate_config(
        inputs.lookup("config"),
        inputs.saving(),
        &host.cwd,
        &host.install_dir,
    )?;

    let store = match &ini_path {
        Some(path) if path.is_file() => {
            tracing::debug!(path = %path.display(), "Loading config");
            ConfigStore::load(path)?
        }
        _ => ConfigStore::new(),
    };

    let mut resolver = Resolver {
        state: RuntimeState::new(host.clone()),
        store,
        warnings: Vec::new(),
    };

    if let Some(location) = inputs.log_override {
        resolver.init(Key::Log, &location.code().to_string(), true)?;
    }

    for key in Key::ALL {
        resolver.init(key, key.default_value(), false)?;
    }
    resolver.apply_pairs(&inputs.env, "env")?;
    resolver.apply_pairs(&inputs.flags, "cli")?;
    resolver.propagate_derived()?;

    let Resolver {
        mut state,
        store,
        warnings,
    } = resolver;

    state.set_logger()?;
    tracing::debug!(
        ini = ?ini_path,
        port = state.port(),
        listen = ?state.listen(),
        gateway = state.gateway(),
        hostonly = state.hostonly(),
        auth = %state.auth(),
        "Resolved configuration"
    );

    Ok(Resolution {
        state,
        store,
        ini_path,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn pairs(items: &[(&str, &str)]) -> Pairs {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn workspace(ini: Option<&str>) -> (TempDir, ConfigInputs) {
        let dir = tempdir().unwrap();
        if let Some(ini) = ini {
            fs::write(dir.path().join("px.ini"), ini).unwrap();
        }
        let inputs = ConfigInputs::new(HostContext::new(dir.path(), dir.path()));
        (dir, inputs)
    }

    #[test]
    fn test_defaults_only() {
        let (_dir, inputs) = workspace(None);
        let res = resolve(&inputs).unwrap();

        assert_eq!(res.state.port(), 3128);
        assert_eq!(res.state.listen(), ["127.0.0.1"]);
        assert_eq!(res.store.get(Key::Socktimeout), Some("20.0"));
        assert_eq!(res.store.get(Key::Allow), Some("*.*.*.*"));
        assert!(res.warnings.is_empty());
        assert!(res.ini_path.is_none());
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let (_dir, inputs) = workspace(Some("[proxy]\nport = 1111\nusername = file\n"));
        let inputs = inputs
            .with_env(pairs(&[("port", "2222"), ("username", "env")]))
            .with_flags(pairs(&[("port", "3333")]));
        let res = resolve(&inputs).unwrap();

        assert_eq!(res.state.port(), 3333);
        assert_eq!(res.state.username(), "env");
        assert_eq!(res.store.get(Key::Port), Some("3333"));
    }

    #[test]
    fn test_invalid_file_value_warns_and_defaults() {
        let (_dir, inputs) = workspace(Some("[settings]\nworkers = many\n"));
        let res = resolve(&inputs).unwrap();

        assert_eq!(res.state.workers(), 2);
        assert_eq!(res.store.get(Key::Workers), Some("2"));
        assert_eq!(res.warnings.len(), 1);
        assert_eq!(res.warnings[0].key, Key::Workers);
    }

    #[test]
    fn test_bad_auth_is_fatal() {
        let (_dir, inputs) = workspace(None);
        let inputs = inputs.with_flags(pairs(&[("auth", "KERBEROS")]));
        assert!(matches!(resolve(&inputs), Err(Error::UnsupportedAuth(_))));
    }

    #[test]
    fn test_missing_explicit_config_is_fatal() {
        let (_dir, inputs) = workspace(None);
        let inputs = inputs.with_flags(pairs(&[("config", "nope.ini")]));
        assert!(matches!(resolve(&inputs), Err(Error::ConfigNotFound(_))));
    }

    #[test]
    fn test_gateway_listens_everywhere() {
        let (_dir, inputs) = workspace(None);
        let res = resolve(&inputs.with_flags(pairs(&[("gateway", "1")]))).unwrap();

        assert_eq!(res.state.listen(), [""]);
        assert_eq!(res.store.get(Key::Listen), Some(""));
        assert_eq!(res.store.get(Key::Allow), Some("*.*.*.*"));
    }

    #[test]
    fn test_hostonly_clears_wide_open_allow() {
        let (_dir, inputs) = workspace(None);
        let res = resolve(&inputs.with_flags(pairs(&[("hostonly", "1")]))).unwrap();

        assert_eq!(res.state.listen(), [""]);
        assert_eq!(res.store.get(Key::Allow), Some(""));
        assert!(res.state.allow().is_empty());
    }

    #[test]
    fn test_hostonly_with_gateway_keeps_custom_allow() {
        let (_dir, inputs) = workspace(Some("[proxy]\nallow = 10.0.0.0/8\n"));
        let res =
            resolve(&inputs.with_flags(pairs(&[("gateway", "1"), ("hostonly", "1")]))).unwrap();

        assert_eq!(res.store.get(Key::Allow), Some("10.0.0.0/8"));
        assert_eq!(res.state.allow().ip_rules().len(), 1);
    }

    #[test]
    fn test_hostonly_without_gateway_clears_custom_allow() {
        let (_dir, inputs) = workspace(Some("[proxy]\nallow = 10.0.0.0/8\n"));
        let res = resolve(&inputs.with_flags(pairs(&[("hostonly", "1")]))).unwrap();

        assert_eq!(res.store.get(Key::Allow), Some(""));
    }

    #[test]
    fn test_log_override_sets_location() {
        let (_dir, inputs) = workspace(None);
        let mut inputs = inputs.with_log_override(LogLocation::WorkingDir);
        inputs.flags = pairs(&[("log", "0")]);
        let res = resolve(&inputs).unwrap();

        // Explicit --log still wins over the debug flag.
        assert_eq!(res.state.log(), LogLocation::None);
        assert_eq!(res.store.get(Key::Log), Some("0"));
    }

    #[test]
    fn test_save_writes_normalized_store() {
        let (dir, inputs) = workspace(None);
        let inputs = inputs.with_flags(pairs(&[("save", "1"), ("socktimeout", "5")]));
        let res = resolve(&inputs).unwrap();

        let path = res.save().unwrap();
        assert_eq!(path, dir.path().join("px.ini"));
        let saved = fs::read_to_string(path).unwrap();
        assert!(saved.contains("socktimeout = 5.0"));
        assert!(!saved.contains("save"));
    }
}
