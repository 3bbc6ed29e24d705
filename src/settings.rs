//! Small persisted key/value store for user preferences.
//!
//! Backed by a JSON object on disk. Every failure (unreadable file, bad
//! JSON, oversized value, failed write) is logged and swallowed: callers
//! always get their fallback.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Largest accepted serialized value
pub const MAX_VALUE_BYTES: usize = 4 * 1024;

/// Key of the explanation detail preference
pub const EXPLANATION_DETAIL_KEY: &str = "explanation_detail";

/// Verbosity of the session description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationDetail {
    Brief,
    #[default]
    Standard,
    Detailed,
}

impl ExplanationDetail {
    /// Next level, wrapping around
    pub fn cycle(self) -> Self {
        match self {
            ExplanationDetail::Brief => ExplanationDetail::Standard,
            ExplanationDetail::Standard => ExplanationDetail::Detailed,
            ExplanationDetail::Detailed => ExplanationDetail::Brief,
        }
    }
}

/// Preference store; in-memory when no path is available
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, Value>,
}

impl SettingsStore {
    /// Store in the platform config directory, if there is one
    pub fn open_default() -> Self {
        match dirs::config_dir() {
            Some(dir) => Self::open(dir.join("wavelab").join("settings.json")),
            None => {
                debug!("No config directory; settings are not persisted");
                Self::in_memory()
            }
        }
    }

    /// Load from `path`; a missing or broken file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, Value>>(&text) {
                Ok(values) => values,
                Err(e) => {
                    warn!("Ignoring malformed settings {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read settings {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self {
            path: Some(path),
            values,
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Stored value for `key`, or `fallback` when absent or unreadable
    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.values.get(key) {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                warn!("Setting '{}' is unreadable ({}); using fallback", key, e);
                fallback
            }),
            None => fallback,
        }
    }

    /// Store `value` under `key`. Returns false if it was rejected.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Setting '{}' cannot be serialized: {}", key, e);
                return false;
            }
        };
        let size = value.to_string().len();
        if size > MAX_VALUE_BYTES {
            warn!(
                "Setting '{}' is {} bytes, over the {} byte limit",
                key, size, MAX_VALUE_BYTES
            );
            return false;
        }
        self.values.insert(key.to_string(), value);
        self.persist();
        true
    }

    pub fn delete(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.persist();
        }
    }

    pub fn explanation_detail(&self) -> ExplanationDetail {
        self.get(EXPLANATION_DETAIL_KEY, ExplanationDetail::default())
    }

    pub fn set_explanation_detail(&mut self, detail: ExplanationDetail) -> bool {
        self.set(EXPLANATION_DETAIL_KEY, &detail)
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = self.write_to(path) {
            warn!("Failed to save settings {}: {}", path.display(), e);
        }
    }

    fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.values)?;
        fs::write(path, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_persist_across_opens() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.json");

        let mut store = SettingsStore::open(&path);
        assert!(store.set("answer", &42u32));
        assert!(store.set_explanation_detail(ExplanationDetail::Detailed));

        let reopened = SettingsStore::open(&path);
        assert_eq!(reopened.get("answer", 0u32), 42);
        assert_eq!(reopened.explanation_detail(), ExplanationDetail::Detailed);
    }

    #[test]
    fn test_absent_equals_default() {
        let store = SettingsStore::in_memory();
        assert_eq!(store.explanation_detail(), ExplanationDetail::Standard);
        assert_eq!(store.get("missing", "fallback".to_string()), "fallback");
    }

    #[test]
    fn test_delete_removes_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let mut store = SettingsStore::open(&path);
        store.set_explanation_detail(ExplanationDetail::Brief);
        store.delete(EXPLANATION_DETAIL_KEY);
        assert_eq!(
            SettingsStore::open(&path).explanation_detail(),
            ExplanationDetail::Standard
        );
    }

    #[test]
    fn test_oversized_value_rejected() {
        let mut store = SettingsStore::in_memory();
        let big = "x".repeat(MAX_VALUE_BYTES + 1);
        assert!(!store.set("big", &big));
        assert_eq!(store.get("big", String::new()), "");
    }

    #[test]
    fn test_malformed_file_is_swallowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").expect("write");

        let store = SettingsStore::open(&path);
        assert_eq!(store.explanation_detail(), ExplanationDetail::Standard);

        // Wrong type under a known key
        fs::write(&path, r#"{"explanation_detail": 7}"#).expect("write");
        assert_eq!(
            SettingsStore::open(&path).explanation_detail(),
            ExplanationDetail::Standard
        );
    }

    #[test]
    fn test_unwritable_path_does_not_fail() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A file where the parent directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").expect("write");
        let mut store = SettingsStore::open(blocker.join("settings.json"));
        assert!(store.set("key", &1u8));
        assert_eq!(store.get("key", 0u8), 1);
    }
}
