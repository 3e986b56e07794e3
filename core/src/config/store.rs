//! Canonical configuration store.
//!
//! An ordered two-level `section -> key -> value` document that mirrors the
//! `px.ini` file. Section and key names are case-insensitive and stored
//! lower-cased; insertion order is kept so saved files stay stable.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{Key, Section};
use crate::error::Result;

fn section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[\s*([^\]]+?)\s*\]\s*$").unwrap())
}

fn entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([^=:\s\[][^=:]*?)\s*[=:]\s?(.*?)\s*$").unwrap())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct StoreSection {
    name: String,
    entries: Vec<(String, String)>,
}

/// In-memory INI document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    sections: Vec<StoreSection>,
}

impl ConfigStore {
    /// An empty store with the `proxy` and `settings` sections present.
    pub fn new() -> Self {
        let mut store = Self::default();
        store.ensure_known_sections();
        store
    }

    /// Parse INI text. Malformed lines are skipped; entries before the
    /// first section header are ignored.
    pub fn parse(text: &str) -> Self {
        let mut store = Self::default();
        let mut current: Option<String> = None;

        for (lineno, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if let Some(caps) = section_re().captures(line) {
                let name = caps[1].to_lowercase();
                store.section_mut(&name);
                current = Some(name);
                continue;
            }

            match (&current, entry_re().captures(line)) {
                (Some(section), Some(caps)) => {
                    let key = caps[1].to_lowercase();
                    let value = caps[2].to_string();
                    store.set_raw(section, &key, value);
                }
                _ => tracing::debug!(line = lineno + 1, "Skipping unparsable config line"),
            }
        }

        store.ensure_known_sections();
        store
    }

    /// Load and parse a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    fn ensure_known_sections(&mut self) {
        for section in Section::ALL {
            self.section_mut(section.name());
        }
    }

    fn section_mut(&mut self, name: &str) -> &mut StoreSection {
        let idx = match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(StoreSection {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }

    /// Look up a raw value.
    pub fn get_raw(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == section)?
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace a raw value, keeping the key's original position.
    pub fn set_raw(&mut self, section: &str, key: &str, value: impl Into<String>) {
        let value = value.into();
        let section = self.section_mut(section);
        match section.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => section.entries.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: Key) -> Option<&str> {
        self.get_raw(key.section().name(), key.name())
    }

    pub fn set(&mut self, key: Key, value: impl Into<String>) {
        self.set_raw(key.section().name(), key.name(), value);
    }

    /// Section names in file order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// Entries of a section in file order.
    pub fn entries<'a>(
        &'a self,
        section: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.sections
            .iter()
            .filter(move |s| s.name == section)
            .flat_map(|s| s.entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Serialize to INI text.
    pub fn to_ini_string(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("[{}]\n", section.name));
            for (key, value) in &section.entries {
                out.push_str(&format!("{} = {}\n", key, value));
            }
            out.push('\n');
        }
        out
    }

    /// Write to disk.
    ///
    /// Writes atomically by writing to a temp file then renaming.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let temp_path = path.with_extension("ini.tmp");
        fs::write(&temp_path, self.to_ini_string())?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_has_known_sections() {
        let store = ConfigStore::new();
        let names: Vec<&str> = store.section_names().collect();
        assert_eq!(names, vec!["proxy", "settings"]);
    }

    #[test]
    fn test_parse_ini() {
        let text = "\
; comment
[Proxy]
Server = proxy.corp:8080
noproxy=localhost, 127.0.0.1
username: CORP\\alice

[settings]
workers = 4
# trailing comment
[extra]
keep = me
";
        let store = ConfigStore::parse(text);
        assert_eq!(store.get(Key::Server), Some("proxy.corp:8080"));
        assert_eq!(store.get(Key::Noproxy), Some("localhost, 127.0.0.1"));
        assert_eq!(store.get(Key::Username), Some("CORP\\alice"));
        assert_eq!(store.get(Key::Workers), Some("4"));
        assert_eq!(store.get_raw("extra", "keep"), Some("me"));
        assert_eq!(store.get(Key::Port), None);
    }

    #[test]
    fn test_empty_values() {
        let store = ConfigStore::parse("[proxy]\nserver = \nallow =\n");
        assert_eq!(store.get(Key::Server), Some(""));
        assert_eq!(store.get(Key::Allow), Some(""));
    }

    #[test]
    fn test_set_preserves_order() {
        let mut store = ConfigStore::new();
        store.set(Key::Server, "a");
        store.set(Key::Port, "1");
        store.set(Key::Server, "b");
        let entries: Vec<_> = store.entries("proxy").collect();
        assert_eq!(entries, vec![("server", "b"), ("port", "1")]);
    }

    #[test]
    fn test_entries_by_computed_section_name() {
        let store = ConfigStore::parse("[extra]\na = 1\nb = 2\n");
        let name = format!("ex{}", "tra");
        let keys: Vec<&str> = store.entries(&name).map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(store.entries("missing").count(), 0);
    }

    #[test]
    fn test_serialize_and_reparse() {
        let mut store = ConfigStore::new();
        store.set(Key::Server, "");
        store.set(Key::Listen, "127.0.0.1");
        store.set(Key::Socktimeout, "20.0");

        let text = store.to_ini_string();
        assert!(text.starts_with("[proxy]\nserver = \nlisten = 127.0.0.1\n\n[settings]\n"));
        assert_eq!(ConfigStore::parse(&text), store);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("px.ini");

        let mut store = ConfigStore::new();
        store.set(Key::Port, "3129");
        store.save(&path).unwrap();

        let loaded = ConfigStore::load(&path).unwrap();
        assert_eq!(loaded.get(Key::Port), Some("3129"));
        assert!(!path.with_extension("ini.tmp").exists());
    }
}
