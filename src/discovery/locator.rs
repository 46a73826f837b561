//! Automatic installation lookup
//!
//! Strategies run in a fixed trust order: installer-written registry data
//! first, then the hard-coded candidate list. The first hit wins.

use std::path::PathBuf;
use std::sync::Arc;

use super::{
    DiscoveryError, InstalledAppLocation, LocationSource, PathValidator, RegistryProbe, RegistrySource, TargetApp,
    ValidationFailure,
};

/// Finds the target executable without user input
pub struct InstallationLocator {
    app: TargetApp,
    registry: Arc<dyn RegistrySource>,
    validator: PathValidator,
}

impl InstallationLocator {
    pub fn new(app: TargetApp, registry: Arc<dyn RegistrySource>) -> Self {
        let validator = app.validator();
        Self {
            app,
            registry,
            validator,
        }
    }

    pub fn app(&self) -> &TargetApp {
        &self.app
    }

    pub fn validator(&self) -> &PathValidator {
        &self.validator
    }

    /// Run all strategies in priority order.
    pub fn auto_detect(&self) -> Option<InstalledAppLocation> {
        if let Some(location) = self.detect_from_registry() {
            tracing::info!("Found {} via registry: {}", self.app.display_name, location.path().display());
            return Some(location);
        }

        if let Some(location) = self.detect_from_well_known_paths() {
            tracing::info!(
                "Found {} at well-known path: {}",
                self.app.display_name,
                location.path().display()
            );
            return Some(location);
        }

        tracing::info!("{} installation not found automatically", self.app.display_name);
        None
    }

    /// Probe each registry key in order; first valid executable wins.
    pub fn detect_from_registry(&self) -> Option<InstalledAppLocation> {
        for probe in &self.app.registry_probes {
            match self.probe_registry(probe) {
                Ok(path) => match InstalledAppLocation::validated(&path, LocationSource::Registry, &self.validator) {
                    Ok(location) => return Some(location),
                    Err(reason) => {
                        tracing::debug!("Registry probe {}: skipping {}: {}", probe, path.display(), reason);
                    }
                },
                Err(DiscoveryError::NotFound(what)) => {
                    tracing::debug!("Registry probe {}: {} not found", probe, what);
                }
                Err(e) => {
                    tracing::warn!("Registry probe {} failed: {}", probe, e);
                }
            }
        }
        None
    }

    /// First candidate from the fixed list that passes validation.
    pub fn detect_from_well_known_paths(&self) -> Option<InstalledAppLocation> {
        self.app.well_known_paths.iter().find_map(|path| {
            match InstalledAppLocation::validated(path, LocationSource::WellKnownPath, &self.validator) {
                Ok(location) => Some(location),
                Err(ValidationFailure::Missing) => None,
                Err(reason) => {
                    tracing::debug!("Skipping candidate {}: {}", path.display(), reason);
                    None
                }
            }
        })
    }

    fn probe_registry(&self, probe: &RegistryProbe) -> Result<PathBuf, DiscoveryError> {
        let install_dir = match self.registry.read_string(probe, &self.app.registry_value) {
            Ok(Some(dir)) if !dir.trim().is_empty() => dir,
            Ok(_) => return Err(DiscoveryError::NotFound(format!("value {}", self.app.registry_value))),
            Err(e) => return Err(e.into()),
        };

        let exe = PathBuf::from(install_dir.trim()).join(self.app.canonical_executable());
        if exe.exists() {
            Ok(exe)
        } else {
            Err(DiscoveryError::NotFound(exe.display().to_string()))
        }
    }
}
