//! Configuration inputs: command-line flags, environment and file location.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Environment variable prefix for settings.
pub const ENV_PREFIX: &str = "PX_";

/// Default config file name.
pub const CONFIG_FILE: &str = "px.ini";

/// Dotenv file name.
pub const DOTENV_FILE: &str = ".env";

/// Ordered `(name, value)` pairs; later entries override earlier ones.
pub type Pairs = Vec<(String, String)>;

/// Normalize command-line flag pairs.
///
/// Names are lower-cased with leading dashes stripped. A bare flag carries
/// the value `"1"`; `proxy` is an alias of `server`.
pub fn normalize_flags<I, K, V>(flags: I) -> Pairs
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    flags
        .into_iter()
        .filter_map(|(name, value)| {
            let name = name.as_ref().trim_start_matches('-').to_lowercase();
            if name.is_empty() {
                return None;
            }
            let name = if name == "proxy" { "server".to_string() } else { name };
            Some((name, value.into()))
        })
        .collect()
}

/// Parse raw `--name=value` / `--name` arguments. Positional arguments are
/// ignored.
pub fn parse_flag_args<I, S>(args: I) -> Pairs
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let pairs: Vec<(String, String)> = args
        .into_iter()
        .filter_map(|arg| {
            let arg = arg.as_ref().strip_prefix("--")?;
            Some(match arg.split_once('=') {
                Some((name, value)) => (name.to_string(), value.to_string()),
                None => (arg.to_string(), "1".to_string()),
            })
        })
        .collect();
    normalize_flags(pairs)
}

/// Strip [`ENV_PREFIX`] from matching variables and lower-case the rest.
pub fn prefixed_env<I>(vars: I) -> Pairs
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut found: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in vars {
        let Some(rest) = name
            .get(..ENV_PREFIX.len())
            .filter(|p| p.eq_ignore_ascii_case(ENV_PREFIX))
            .map(|_| &name[ENV_PREFIX.len()..])
        else {
            continue;
        };
        if !rest.is_empty() {
            found.insert(rest.to_lowercase(), value);
        }
    }
    found.into_iter().collect()
}

fn dotenv_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:export\s+)?([A-Za-z_][A-Za-z0-9_.]*)\s*=\s*(.*?)\s*$").unwrap()
    })
}

/// Parse dotenv text into variables.
pub fn parse_dotenv(text: &str) -> Pairs {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| dotenv_re().captures(line))
        .map(|caps| (caps[1].to_string(), unquote(&caps[2])))
        .collect()
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    // Unquoted values may carry a trailing comment
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end().to_string(),
        None => value.to_string(),
    }
}

/// Locate the dotenv file: working directory first, then the install
/// directory.
pub fn find_dotenv(cwd: &Path, install_dir: &Path) -> Option<PathBuf> {
    [cwd, install_dir]
        .into_iter()
        .map(|dir| dir.join(DOTENV_FILE))
        .find(|path| path.is_file())
}

/// Gather `PX_` settings from the process environment and a dotenv file.
///
/// Variables already set in the process take precedence over dotenv entries.
pub fn gather_env<I>(process_vars: I, cwd: &Path, install_dir: &Path) -> Pairs
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut vars: BTreeMap<String, String> = BTreeMap::new();

    if let Some(path) = find_dotenv(cwd, install_dir) {
        match fs::read_to_string(&path) {
            Ok(text) => {
                tracing::debug!(path = %path.display(), "Loading dotenv file");
                vars.extend(parse_dotenv(&text));
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to read dotenv file"),
        }
    }
    vars.extend(process_vars);

    prefixed_env(vars)
}

/// Decide which config file to use.
///
/// An explicit path must exist unless the caller is about to save. Otherwise
/// `px.ini` in the working directory is used when present or when saving,
/// and the install directory's `px.ini` is the fallback.
pub fn locate_config(
    explicit: Option<&str>,
    saving: bool,
    cwd: &Path,
    install_dir: &Path,
) -> Result<Option<PathBuf>> {
    if let Some(explicit) = explicit.filter(|p| !p.is_empty()) {
        let path = PathBuf::from(explicit);
        let path = if path.is_absolute() { path } else { cwd.join(path) };
        if path.is_file() || saving {
            return Ok(Some(path));
        }
        return Err(Error::ConfigNotFound(path));
    }

    let local = cwd.join(CONFIG_FILE);
    if local.is_file() || saving {
        return Ok(Some(local));
    }

    let installed = install_dir.join(CONFIG_FILE);
    Ok(installed.is_file().then_some(installed))
}

/// Last value for `name` in `pairs`.
pub fn lookup<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pairs(items: &[(&str, &str)]) -> Pairs {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_parse_flag_args() {
        let flags = parse_flag_args(["px", "--Port=3129", "--gateway", "--proxy=up:80", "stray"]);
        assert_eq!(
            flags,
            pairs(&[("port", "3129"), ("gateway", "1"), ("server", "up:80")])
        );
    }

    #[test]
    fn test_flag_value_keeps_equals() {
        let flags = parse_flag_args(["--useragent=a=b"]);
        assert_eq!(flags, pairs(&[("useragent", "a=b")]));
    }

    #[test]
    fn test_prefixed_env() {
        let env = prefixed_env(pairs(&[
            ("PX_PORT", "4000"),
            ("px_Gateway", "1"),
            ("PX_", "ignored"),
            ("PATH", "/bin"),
        ]));
        assert_eq!(env, pairs(&[("gateway", "1"), ("port", "4000")]));
    }

    #[test]
    fn test_parse_dotenv() {
        let text = "# comment\nPX_PORT=4000\nexport PX_SERVER = \"up:8080\"\nPX_USERNAME='CORP\\bob'\nPX_NOPROXY=localhost # local\nnot a line\n";
        assert_eq!(
            parse_dotenv(text),
            pairs(&[
                ("PX_PORT", "4000"),
                ("PX_SERVER", "up:8080"),
                ("PX_USERNAME", "CORP\\bob"),
                ("PX_NOPROXY", "localhost"),
            ])
        );
    }

    #[test]
    fn test_process_env_beats_dotenv() {
        let cwd = tempdir().unwrap();
        let install = tempdir().unwrap();
        fs::write(cwd.path().join(".env"), "PX_PORT=4000\nPX_IDLE=10\n").unwrap();

        let env = gather_env(pairs(&[("PX_PORT", "5000")]), cwd.path(), install.path());
        assert_eq!(lookup(&env, "port"), Some("5000"));
        assert_eq!(lookup(&env, "idle"), Some("10"));
    }

    #[test]
    fn test_dotenv_install_dir_fallback() {
        let cwd = tempdir().unwrap();
        let install = tempdir().unwrap();
        fs::write(install.path().join(".env"), "PX_WORKERS=3\n").unwrap();

        let env = gather_env(Vec::new(), cwd.path(), install.path());
        assert_eq!(lookup(&env, "workers"), Some("3"));
    }

    #[test]
    fn test_locate_config() {
        let cwd = tempdir().unwrap();
        let install = tempdir().unwrap();

        assert_eq!(locate_config(None, false, cwd.path(), install.path()).unwrap(), None);
        assert_eq!(
            locate_config(None, true, cwd.path(), install.path()).unwrap(),
            Some(cwd.path().join("px.ini"))
        );

        fs::write(install.path().join("px.ini"), "").unwrap();
        assert_eq!(
            locate_config(None, false, cwd.path(), install.path()).unwrap(),
            Some(install.path().join("px.ini"))
        );

        fs::write(cwd.path().join("px.ini"), "").unwrap();
        assert_eq!(
            locate_config(None, false, cwd.path(), install.path()).unwrap(),
            Some(cwd.path().join("px.ini"))
        );
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let cwd = tempdir().unwrap();
        let err = locate_config(Some("missing.ini"), false, cwd.path(), cwd.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(p) if p.ends_with("missing.ini")));

        let saved = locate_config(Some("new.ini"), true, cwd.path(), cwd.path()).unwrap();
        assert_eq!(saved, Some(cwd.path().join("new.ini")));
    }
}
