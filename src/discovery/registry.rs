//! Registry lookups for installer-recorded paths
//!
//! Missing keys and values are `Ok(None)`. Only unexpected failures surface
//! as errors, and the locator treats those as "not found" for that key.

use std::fmt;
use std::io;

use thiserror::Error;

/// Registry root a probe is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryHive {
    LocalMachine,
    CurrentUser,
}

impl fmt::Display for RegistryHive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryHive::LocalMachine => write!(f, "HKEY_LOCAL_MACHINE"),
            RegistryHive::CurrentUser => write!(f, "HKEY_CURRENT_USER"),
        }
    }
}

/// One key location to probe
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryProbe {
    pub hive: RegistryHive,
    pub subkey: String,
}

impl RegistryProbe {
    pub fn local_machine(subkey: impl Into<String>) -> Self {
        Self {
            hive: RegistryHive::LocalMachine,
            subkey: subkey.into(),
        }
    }

    pub fn current_user(subkey: impl Into<String>) -> Self {
        Self {
            hive: RegistryHive::CurrentUser,
            subkey: subkey.into(),
        }
    }
}

impl fmt::Display for RegistryProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r"{}\{}", self.hive, self.subkey)
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry read of {probe} failed: {source}")]
    #[cfg_attr(not(any(windows, test)), allow(dead_code))]
    Io {
        probe: String,
        #[source]
        source: io::Error,
    },
}

/// Source of string values stored under registry keys
pub trait RegistrySource: Send + Sync {
    /// Read a string value. `Ok(None)` when the key or the value is absent.
    fn read_string(&self, probe: &RegistryProbe, value: &str) -> Result<Option<String>, RegistryError>;
}

/// The operating system registry
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRegistry;

impl SystemRegistry {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
impl RegistrySource for SystemRegistry {
    fn read_string(&self, probe: &RegistryProbe, value: &str) -> Result<Option<String>, RegistryError> {
        use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};
        use winreg::RegKey;

        let root = match probe.hive {
            RegistryHive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
            RegistryHive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
        };

        let key = match root.open_subkey(&probe.subkey) {
            Ok(key) => key,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RegistryError::Io {
                    probe: probe.to_string(),
                    source,
                })
            }
        };

        match key.get_value::<String, _>(value) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(RegistryError::Io {
                probe: probe.to_string(),
                source,
            }),
        }
    }
}

#[cfg(not(windows))]
impl RegistrySource for SystemRegistry {
    fn read_string(&self, _probe: &RegistryProbe, _value: &str) -> Result<Option<String>, RegistryError> {
        Ok(None)
    }
}

/// In-memory registry for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct StaticRegistry {
    values: std::collections::HashMap<(RegistryProbe, String), Result<String, io::ErrorKind>>,
}

#[cfg(test)]
impl StaticRegistry {
    pub(crate) fn with_value(mut self, probe: RegistryProbe, value: &str, data: impl Into<String>) -> Self {
        self.values.insert((probe, value.to_string()), Ok(data.into()));
        self
    }

    pub(crate) fn with_failure(mut self, probe: RegistryProbe, value: &str, kind: io::ErrorKind) -> Self {
        self.values.insert((probe, value.to_string()), Err(kind));
        self
    }
}

#[cfg(test)]
impl RegistrySource for StaticRegistry {
    fn read_string(&self, probe: &RegistryProbe, value: &str) -> Result<Option<String>, RegistryError> {
        match self.values.get(&(probe.clone(), value.to_string())) {
            None => Ok(None),
            Some(Ok(data)) => Ok(Some(data.clone())),
            Some(Err(kind)) => Err(RegistryError::Io {
                probe: probe.to_string(),
                source: io::Error::from(*kind),
            }),
        }
    }
}
