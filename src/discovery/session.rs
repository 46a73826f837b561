//! Startup and manual-override discovery flows
//!
//! Results reach the UI thread as one [`DiscoveryState`] per run over a
//! channel; the session never writes UI state itself.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crossbeam_channel::Sender;

use super::{
    ChooserFilter, DiscoveryError, InstallationLocator, InstalledAppLocation, LocationSource,
    ValidationFailure,
};
use crate::config::ConfigStore;

/// A resolved installation plus the outcome of saving it
#[derive(Debug, Clone)]
pub struct Resolution {
    pub location: InstalledAppLocation,
    /// Set when the path could not be written to the config file
    pub persist_error: Option<String>,
}

/// Value published to the UI after each discovery run
#[derive(Debug, Clone)]
pub enum DiscoveryState {
    Resolved(Resolution),
    /// All strategies failed; the user must pick the executable
    Unresolved,
    /// A user-supplied path failed validation
    Rejected {
        path: PathBuf,
        reason: ValidationFailure,
    },
}

impl DiscoveryState {
    pub fn path(&self) -> Option<&Path> {
        match self {
            DiscoveryState::Resolved(resolution) => Some(resolution.location.path()),
            _ => None,
        }
    }

    /// Hint text for the path input
    pub fn hint(&self) -> String {
        match self {
            DiscoveryState::Resolved(resolution) => match resolution.location.source() {
                LocationSource::Persisted => "Installation path loaded".to_string(),
                LocationSource::Registry | LocationSource::WellKnownPath => {
                    "Installation path detected automatically".to_string()
                }
                LocationSource::UserOverride => "Installation path selected".to_string(),
            },
            DiscoveryState::Unresolved => {
                "Installation not found, please select the program manually".to_string()
            }
            DiscoveryState::Rejected { reason, .. } => {
                format!("The selected file is not a valid program: {}", reason)
            }
        }
    }

    /// Whether the path input should accept typing
    pub fn editable(&self) -> bool {
        !matches!(self, DiscoveryState::Resolved(_))
    }

    /// Typed error view of the non-resolved states
    pub fn error(&self) -> Option<DiscoveryError> {
        match self {
            DiscoveryState::Resolved(_) => None,
            DiscoveryState::Unresolved => Some(DiscoveryError::Unresolved),
            DiscoveryState::Rejected { path, reason } => Some(DiscoveryError::ValidationFailed {
                path: path.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Orchestrates config store, locator, and validator
#[derive(Clone)]
pub struct DiscoverySession {
    config: Arc<Mutex<ConfigStore>>,
    locator: Arc<InstallationLocator>,
    publisher: Sender<DiscoveryState>,
}

impl DiscoverySession {
    pub fn new(
        config: Arc<Mutex<ConfigStore>>,
        locator: Arc<InstallationLocator>,
        publisher: Sender<DiscoveryState>,
    ) -> Self {
        Self {
            config,
            locator,
            publisher,
        }
    }

    /// File chooser constraint for manual selection
    pub fn chooser_filter(&self) -> &ChooserFilter {
        &self.locator.app().chooser
    }

    /// Run the startup flow on the blocking pool.
    ///
    /// Registry and filesystem probes can stall on slow storage, so they
    /// must not run on the UI thread.
    pub fn spawn_startup(&self) -> tokio::task::JoinHandle<DiscoveryState> {
        let session = self.clone();
        tokio::task::spawn_blocking(move || session.run_startup())
    }

    /// Saved path if still valid, else auto-detect, else unresolved.
    pub fn run_startup(&self) -> DiscoveryState {
        let state = self.resolve_startup();
        self.publish(state.clone());
        state
    }

    /// Validate and save a path picked by the user.
    ///
    /// A rejected path leaves the stored config untouched.
    pub fn apply_override(&self, path: impl Into<PathBuf>) -> DiscoveryState {
        let path = path.into();
        let state = match InstalledAppLocation::validated(&path, LocationSource::UserOverride, self.locator.validator()) {
            Ok(location) => self.persist(location),
            Err(reason) => {
                tracing::warn!("Rejected installation path {}: {}", path.display(), reason);
                DiscoveryState::Rejected { path, reason }
            }
        };
        self.publish(state.clone());
        state
    }

    fn resolve_startup(&self) -> DiscoveryState {
        if let Some(saved) = self.saved_path() {
            let location = InstalledAppLocation::check(saved, LocationSource::Persisted, self.locator.validator());
            if location.is_valid() {
                tracing::debug!("Using saved installation path {}", location.path().display());
                return DiscoveryState::Resolved(Resolution {
                    location,
                    persist_error: None,
                });
            }
            tracing::info!(
                "Saved installation path {} is no longer valid, rescanning",
                location.path().display()
            );
        }

        match self.locator.auto_detect() {
            Some(location) if location.is_valid() => self.persist(location),
            Some(location) => {
                tracing::warn!("Ignoring invalid detected path {}", location.path().display());
                DiscoveryState::Unresolved
            }
            None => DiscoveryState::Unresolved,
        }
    }

    fn saved_path(&self) -> Option<PathBuf> {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .installation_path()
            .map(PathBuf::from)
    }

    fn persist(&self, location: InstalledAppLocation) -> DiscoveryState {
        let result = self
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .set_installation_path(location.path())
            .map_err(DiscoveryError::from);

        let persist_error = match result {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("{}", e);
                Some(e.to_string())
            }
        };

        DiscoveryState::Resolved(Resolution {
            location,
            persist_error,
        })
    }

    fn publish(&self, state: DiscoveryState) {
        if self.publisher.send(state).is_err() {
            tracing::debug!("Discovery result dropped, no listener");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::INSTALLATION_PATH_KEY;
    use crate::discovery::{StaticRegistry, TargetApp};
    use crossbeam_channel::Receiver;
    use std::fs;

    struct Fixture {
        _tmp: tempfile::TempDir,
        root: PathBuf,
        config_path: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let root = tmp.path().to_path_buf();
            let config_path = root.join("config.json");
            Self {
                _tmp: tmp,
                root,
                config_path,
            }
        }

        fn exe(&self, dir: &str, name: &str) -> PathBuf {
            let dir = self.root.join(dir);
            fs::create_dir_all(&dir).unwrap();
            let path = dir.join(name);
            fs::write(&path, b"").unwrap();
            path
        }

        fn session(&self, candidates: Vec<PathBuf>) -> (DiscoverySession, Receiver<DiscoveryState>) {
            let app = TargetApp {
                well_known_paths: candidates,
                ..TargetApp::wechat()
            };
            let locator = InstallationLocator::new(app, Arc::new(StaticRegistry::default()));
            let config = Arc::new(Mutex::new(ConfigStore::open(&self.config_path)));
            let (tx, rx) = crossbeam_channel::unbounded();
            (DiscoverySession::new(config, Arc::new(locator), tx), rx)
        }

        fn stored_path(&self) -> Option<String> {
            crate::config::try_load(&self.config_path)
                .unwrap()
                .get(INSTALLATION_PATH_KEY)
                .cloned()
        }
    }

    #[test]
    fn test_saved_path_short_circuits_scan() {
        let fx = Fixture::new();
        let saved = fx.exe("saved", "WeChat.exe");
        let candidate = fx.exe("candidate", "WeChat.exe");
        ConfigStore::open(&fx.config_path)
            .set_installation_path(&saved)
            .unwrap();

        let (session, rx) = fx.session(vec![candidate]);
        let state = session.run_startup();

        assert_eq!(state.path(), Some(saved.as_path()));
        assert!(!state.editable());
        let published = rx.try_recv().unwrap();
        match published {
            DiscoveryState::Resolved(resolution) => {
                assert_eq!(resolution.location.source(), LocationSource::Persisted);
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stale_saved_path_triggers_detection_and_persist() {
        let fx = Fixture::new();
        let candidate = fx.exe("candidate", "WeChat.exe");
        ConfigStore::open(&fx.config_path)
            .set_installation_path(&fx.root.join("gone").join("WeChat.exe"))
            .unwrap();

        let (session, _rx) = fx.session(vec![candidate.clone()]);
        let state = session.run_startup();

        assert_eq!(state.path(), Some(candidate.as_path()));
        assert_eq!(fx.stored_path(), Some(candidate.to_string_lossy().into_owned()));
    }

    #[test]
    fn test_detected_file_with_wrong_name_is_not_saved() {
        let fx = Fixture::new();
        let installer = fx.exe("downloads", "WeChatSetup.exe");
        let (session, rx) = fx.session(vec![installer]);

        let state = session.run_startup();
        assert!(matches!(state, DiscoveryState::Unresolved));
        assert!(matches!(rx.try_recv().unwrap(), DiscoveryState::Unresolved));
        assert!(fx.stored_path().is_none());
    }

    #[test]
    fn test_override_of_missing_file_is_rejected() {
        let fx = Fixture::new();
        let (session, _rx) = fx.session(Vec::new());

        let state = session.apply_override(fx.root.join("gone").join("WeChat.exe"));
        assert!(matches!(
            state,
            DiscoveryState::Rejected {
                reason: ValidationFailure::Missing,
                ..
            }
        ));
        assert!(fx.stored_path().is_none());
    }

    #[test]
    fn test_nothing_found_is_unresolved() {
        let fx = Fixture::new();
        let (session, rx) = fx.session(Vec::new());

        let state = session.run_startup();
        assert!(matches!(state, DiscoveryState::Unresolved));
        assert!(state.editable());
        assert!(matches!(state.error(), Some(DiscoveryError::Unresolved)));
        assert!(matches!(rx.try_recv().unwrap(), DiscoveryState::Unresolved));
        assert!(fx.stored_path().is_none());
    }

    #[test]
    fn test_rejected_override_keeps_config() {
        let fx = Fixture::new();
        let good = fx.exe("good", "WeChat.exe");
        let bad = fx.exe("bad", "calc.exe");
        let (session, _rx) = fx.session(Vec::new());

        assert!(matches!(session.apply_override(&good), DiscoveryState::Resolved(_)));
        let before = fx.stored_path();

        let state = session.apply_override(&bad);
        assert!(matches!(
            state,
            DiscoveryState::Rejected {
                reason: ValidationFailure::WrongName { .. },
                ..
            }
        ));
        assert!(matches!(
            state.error(),
            Some(DiscoveryError::ValidationFailed { .. })
        ));
        assert_eq!(fx.stored_path(), before);
        assert_eq!(before, Some(good.to_string_lossy().into_owned()));
    }

    #[test]
    fn test_override_persist_failure_still_resolves() {
        let fx = Fixture::new();
        let exe = fx.exe("app", "WeChat.exe");
        fs::create_dir_all(&fx.config_path).unwrap();
        let (session, _rx) = fx.session(Vec::new());

        match session.apply_override(&exe) {
            DiscoveryState::Resolved(resolution) => {
                assert!(resolution.persist_error.is_some());
                assert_eq!(resolution.location.source(), LocationSource::UserOverride);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_spawned_startup_publishes_once() {
        let fx = Fixture::new();
        let candidate = fx.exe("candidate", "Weixin.exe");
        let (session, rx) = fx.session(vec![candidate.clone()]);

        let state = tokio_test::block_on(async { session.spawn_startup().await.unwrap() });

        assert_eq!(state.path(), Some(candidate.as_path()));
        assert_eq!(rx.try_recv().unwrap().path(), Some(candidate.as_path()));
        assert!(rx.try_recv().is_err());
    }
}
