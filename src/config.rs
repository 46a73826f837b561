//! Persistent key/value configuration
//!
//! A flat JSON object of string values stored next to the executable.
//! The store owns both the file and the in-memory map; everything else goes
//! through its methods.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// File name of the configuration document
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Key holding the discovered installation path
pub const INSTALLATION_PATH_KEY: &str = "installation_path";

/// Key used by earlier releases for the same value
const LEGACY_INSTALLATION_PATH_KEY: &str = "wechat_path";

/// Errors raised by config file operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Location of the config file: next to the running executable.
pub fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Read and parse a config file.
///
/// A missing file is an empty config, not an error. Non-string values are
/// skipped so a hand-edited number or bool does not discard the whole file.
pub fn try_load(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let document: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut entries = BTreeMap::new();
    for (key, value) in document {
        match value {
            serde_json::Value::String(s) => {
                entries.insert(key, s);
            }
            other => {
                tracing::warn!("Ignoring non-string config value for '{}': {}", key, other);
            }
        }
    }
    Ok(entries)
}

/// Durable key/value store backed by one JSON file
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl ConfigStore {
    /// Open the store at `path`, loading whatever is currently on disk.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            entries: BTreeMap::new(),
        };
        store.entries = store.load();
        store
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the backing file. Never fails: errors yield an empty map and
    /// a warning.
    pub fn load(&self) -> BTreeMap<String, String> {
        match try_load(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Config load failed, starting empty: {}", e);
                BTreeMap::new()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Set a value and rewrite the file.
    ///
    /// On a write error the new value stays in memory; the file keeps its
    /// previous contents until the next successful save.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), ConfigError> {
        self.entries.insert(key.into(), value.into());
        self.save()
    }

    /// Remove a key and rewrite the file. Returns whether the key existed.
    ///
    /// Removing the installation path also drops the legacy key so it cannot
    /// resurface through the fallback.
    pub fn remove(&mut self, key: &str) -> Result<bool, ConfigError> {
        let mut existed = self.entries.remove(key).is_some();
        if key == INSTALLATION_PATH_KEY {
            existed |= self.entries.remove(LEGACY_INSTALLATION_PATH_KEY).is_some();
        }
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    /// Stored installation path, falling back to the legacy key.
    pub fn installation_path(&self) -> Option<&str> {
        self.get(INSTALLATION_PATH_KEY)
            .or_else(|| self.get(LEGACY_INSTALLATION_PATH_KEY))
            .filter(|p| !p.trim().is_empty())
    }

    /// Store the installation path under the current key, retiring the legacy one.
    pub fn set_installation_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.entries.remove(LEGACY_INSTALLATION_PATH_KEY);
        self.set(INSTALLATION_PATH_KEY, path.to_string_lossy())
    }

    fn save(&self) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(&self.entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: self.path.clone(),
                source,
            })?;
        }

        fs::write(&self.path, contents).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!("Saved config to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(tmp.path().join("config.json"));
        assert!(store.entries().is_empty());
        assert!(try_load(store.path()).unwrap().is_empty());
    }

    #[test]
    fn test_set_survives_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        let exe = r"C:\Program Files\Tencent\WeChat\WeChat.exe";

        let mut store = ConfigStore::open(&path);
        store.set(INSTALLATION_PATH_KEY, exe).unwrap();
        drop(store);

        let reopened = ConfigStore::open(&path);
        assert_eq!(reopened.get(INSTALLATION_PATH_KEY), Some(exe));
        assert_eq!(
            reopened.load().get(INSTALLATION_PATH_KEY).map(String::as_str),
            Some(exe)
        );
    }

    #[test]
    fn test_corrupted_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let store = ConfigStore::open(&path);
        assert!(store.entries().is_empty());
        assert!(matches!(try_load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_non_string_values_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{"installation_path": "D:\\WeChat.exe", "retries": 3}"#).unwrap();

        let store = ConfigStore::open(&path);
        assert_eq!(store.installation_path(), Some(r"D:\WeChat.exe"));
        assert!(store.get("retries").is_none());
    }

    #[test]
    fn test_legacy_key_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{"wechat_path": "C:\\old\\WeChat.exe"}"#).unwrap();

        let mut store = ConfigStore::open(&path);
        assert_eq!(store.installation_path(), Some(r"C:\old\WeChat.exe"));

        store.set_installation_path(Path::new(r"C:\new\WeChat.exe")).unwrap();
        assert_eq!(store.installation_path(), Some(r"C:\new\WeChat.exe"));
        assert!(!try_load(&path).unwrap().contains_key(LEGACY_INSTALLATION_PATH_KEY));
    }

    #[test]
    fn test_unset_installation_path_clears_legacy_key() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(
            &path,
            r#"{"installation_path": "C:\\new\\WeChat.exe", "wechat_path": "C:\\old\\WeChat.exe"}"#,
        )
        .unwrap();

        let mut store = ConfigStore::open(&path);
        assert!(store.remove(INSTALLATION_PATH_KEY).unwrap());
        assert_eq!(store.installation_path(), None);
        assert!(ConfigStore::open(&path).installation_path().is_none());
    }

    #[test]
    fn test_failed_write_keeps_memory_value() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory in place of the file makes the write fail
        let path = tmp.path().join("config.json");
        fs::create_dir(&path).unwrap();

        let mut store = ConfigStore::open(&path);
        let result = store.set("theme", "dark");
        assert!(matches!(result, Err(ConfigError::Write { .. })));
        assert_eq!(store.get("theme"), Some("dark"));
    }

    #[test]
    fn test_remove_rewrites_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.json");

        let mut store = ConfigStore::open(&path);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert!(store.remove("a").unwrap());
        assert!(!store.remove("missing").unwrap());

        let on_disk = try_load(&path).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk.get("b").map(String::as_str), Some("2"));
    }
}
