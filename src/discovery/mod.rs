//! Installed-application discovery
//!
//! Finds the WeChat executable through the registry, a list of historically
//! common install locations, or a user-supplied path, and keeps the result
//! in the config store.

mod locator;
mod registry;
mod session;
mod validator;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use locator::*;
pub use registry::*;
pub use session::*;
pub use validator::*;

use crate::config::ConfigError;

/// Where an installation path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationSource {
    /// Install path recorded by the installer in the registry
    Registry,
    /// One of the hard-coded candidate locations
    WellKnownPath,
    /// Picked by the user
    UserOverride,
    /// Read back from the config file
    Persisted,
}

impl LocationSource {
    pub fn label(&self) -> &'static str {
        match self {
            LocationSource::Registry => "registry",
            LocationSource::WellKnownPath => "well-known path",
            LocationSource::UserOverride => "user override",
            LocationSource::Persisted => "saved config",
        }
    }
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A candidate installation path together with its validation result.
///
/// The only constructor runs the validator, so `is_valid()` is always a
/// checked fact as of construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledAppLocation {
    path: PathBuf,
    source: LocationSource,
    valid: bool,
}

impl InstalledAppLocation {
    pub fn check(path: impl Into<PathBuf>, source: LocationSource, validator: &PathValidator) -> Self {
        let path = path.into();
        let valid = validator.validate(&path);
        Self { path, source, valid }
    }

    /// Validate once and keep the location only if it passed.
    pub fn validated(
        path: impl Into<PathBuf>,
        source: LocationSource,
        validator: &PathValidator,
    ) -> Result<Self, ValidationFailure> {
        let path = path.into();
        validator.check(&path)?;
        Ok(Self {
            path,
            source,
            valid: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> LocationSource {
        self.source
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Re-run validation; the file may have been removed since.
    #[cfg(test)]
    pub fn revalidate(&mut self, validator: &PathValidator) -> bool {
        self.valid = validator.validate(&self.path);
        self.valid
    }
}

/// Constraint passed to the UI's file chooser for manual selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChooserFilter {
    pub title: String,
    pub extensions: Vec<String>,
    pub initial_directory: PathBuf,
}

/// Description of the application being discovered
#[derive(Debug, Clone)]
pub struct TargetApp {
    pub display_name: String,
    /// Accepted executable file names; the first one is canonical
    pub executable_names: Vec<String>,
    /// Registry keys probed in order
    pub registry_probes: Vec<RegistryProbe>,
    /// Value under each key that holds the install directory
    pub registry_value: String,
    /// Candidate executable paths probed in order
    pub well_known_paths: Vec<PathBuf>,
    pub chooser: ChooserFilter,
}

impl TargetApp {
    /// WeChat desktop client, including the newer "Weixin" builds
    pub fn wechat() -> Self {
        let products = [("WeChat", "WeChat.exe"), ("Weixin", "Weixin.exe")];
        let drives = ["C:", "D:"];
        let program_dirs = ["Program Files", "Program Files (x86)"];

        let mut well_known_paths = Vec::new();
        for (product, exe) in products {
            for drive in drives {
                for program_dir in program_dirs {
                    well_known_paths.push(PathBuf::from(format!(
                        r"{}\{}\Tencent\{}\{}",
                        drive, program_dir, product, exe
                    )));
                }
            }
        }

        Self {
            display_name: "WeChat".to_string(),
            executable_names: vec!["WeChat.exe".to_string(), "Weixin.exe".to_string()],
            registry_probes: vec![
                RegistryProbe::local_machine(r"SOFTWARE\Tencent\WeChat"),
                RegistryProbe::local_machine(r"SOFTWARE\WOW6432Node\Tencent\WeChat"),
                RegistryProbe::current_user(r"Software\Tencent\WeChat"),
            ],
            registry_value: "InstallPath".to_string(),
            well_known_paths,
            chooser: ChooserFilter {
                title: "Select the WeChat program".to_string(),
                extensions: vec!["exe".to_string()],
                initial_directory: PathBuf::from(r"C:\Program Files"),
            },
        }
    }

    /// Name appended to a registry install directory
    pub fn canonical_executable(&self) -> &str {
        self.executable_names
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn validator(&self) -> PathValidator {
        PathValidator::new(self.executable_names.clone())
    }
}

impl Default for TargetApp {
    fn default() -> Self {
        Self::wechat()
    }
}

/// Discovery failure taxonomy
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Registry key, value, or file absent; the next strategy is tried
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid installation path {}: {reason}", .path.display())]
    ValidationFailed {
        path: PathBuf,
        reason: ValidationFailure,
    },

    /// Unexpected registry failure; treated as "not found" for that key
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to persist installation path: {0}")]
    PersistenceFailed(#[from] ConfigError),

    #[error("no installation found, select the executable manually")]
    Unresolved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wechat_candidate_order() {
        let app = TargetApp::wechat();
        assert_eq!(app.well_known_paths.len(), 8);
        assert_eq!(
            app.well_known_paths[0],
            PathBuf::from(r"C:\Program Files\Tencent\WeChat\WeChat.exe")
        );
        assert_eq!(
            app.well_known_paths[1],
            PathBuf::from(r"C:\Program Files (x86)\Tencent\WeChat\WeChat.exe")
        );
        assert_eq!(
            app.well_known_paths[4],
            PathBuf::from(r"C:\Program Files\Tencent\Weixin\Weixin.exe")
        );
        assert_eq!(app.canonical_executable(), "WeChat.exe");

        // Installer-wide keys before the per-user one, native view first
        assert_eq!(app.registry_probes.len(), 3);
        assert_eq!(app.registry_probes[0].hive, RegistryHive::LocalMachine);
        assert!(app.registry_probes[1].subkey.contains("WOW6432Node"));
        assert_eq!(app.registry_probes[2].hive, RegistryHive::CurrentUser);
    }

    #[test]
    fn test_location_tracks_validity() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = tmp.path().join("WeChat.exe");
        std::fs::write(&exe, b"").unwrap();
        let validator = TargetApp::wechat().validator();

        let mut location = InstalledAppLocation::check(&exe, LocationSource::UserOverride, &validator);
        assert!(location.is_valid());
        assert_eq!(location.source(), LocationSource::UserOverride);

        std::fs::remove_file(&exe).unwrap();
        assert!(location.is_valid());
        assert!(!location.revalidate(&validator));
        assert!(!location.is_valid());
    }
}
