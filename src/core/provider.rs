//! Computes the per-domain config directories and wires them to watchers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::ConfigDomain;
use crate::error::{DiscoveryError, Result};
use crate::watch::DirectoryWatcher;

/// Supplies the agent's base configuration root directory.
///
/// Owned and lifecycle-managed outside this crate; the returned path is
/// assumed stable for the process lifetime.
pub trait SettingsProvider: Send + Sync {
    /// Absolute base directory for all configuration storage.
    fn config_root(&self) -> PathBuf;
}

/// A [`SettingsProvider`] backed by a fixed path.
pub struct StaticSettings {
    root: PathBuf,
}

impl StaticSettings {
    /// Create a settings provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SettingsProvider for StaticSettings {
    fn config_root(&self) -> PathBuf {
        self.root.clone()
    }
}

/// Orchestrates configuration discovery: computes the two domain-specific
/// directories under the settings provider's root, ensures each exists, and
/// registers each with its domain's [`DirectoryWatcher`].
///
/// Watchers are injected rather than reached through globals; whoever owns
/// process startup constructs one watcher per domain and hands both here.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use config_discovery::core::{ConfigDomain, ConfigProvider, StaticSettings};
/// use config_discovery::watch::DirectoryWatcher;
///
/// let settings = Arc::new(StaticSettings::new("/etc/agent/config"));
/// let pipeline = Arc::new(DirectoryWatcher::new(ConfigDomain::Pipeline));
/// let instance = Arc::new(DirectoryWatcher::new(ConfigDomain::Instance));
///
/// let provider = ConfigProvider::new(settings, pipeline, instance);
/// provider.initialize("default");
/// ```
pub struct ConfigProvider {
    settings: Arc<dyn SettingsProvider>,
    pipeline: Arc<DirectoryWatcher>,
    instance: Arc<DirectoryWatcher>,
}

impl ConfigProvider {
    /// Create a provider over the given settings and per-domain watchers.
    ///
    /// # Panics
    ///
    /// Panics if a watcher is passed for the wrong domain; the wiring is a
    /// startup-time decision and getting it backwards is a programming error.
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        pipeline: Arc<DirectoryWatcher>,
        instance: Arc<DirectoryWatcher>,
    ) -> Self {
        assert_eq!(pipeline.domain(), ConfigDomain::Pipeline);
        assert_eq!(instance.domain(), ConfigDomain::Instance);
        Self {
            settings,
            pipeline,
            instance,
        }
    }

    /// Discover and register both domains' config directories.
    ///
    /// For each domain, computes `<root>/<domain dir>/<suffix>`, attempts to
    /// create it (with all missing ancestors), and registers it with that
    /// domain's watcher. Directory creation failures are logged as warnings
    /// and never abort the other domain: a missing directory simply yields an
    /// empty config set until it can be created. Calling `initialize` again
    /// with the same suffix registers nothing new.
    pub fn initialize(&self, suffix: &str) {
        for domain in ConfigDomain::ALL {
            let dir = self.source_dir(domain, suffix);

            if let Err(e) = ensure_directory(&dir) {
                warn!(
                    %domain,
                    error = %e,
                    "could not create config directory, domain starts with an empty config set"
                );
            }

            if self.watcher(domain).register(&dir) {
                info!(%domain, dir = %dir.display(), "config source initialized");
            }
        }
    }

    /// The on-disk directory for `domain` under the given suffix.
    pub fn source_dir(&self, domain: ConfigDomain, suffix: &str) -> PathBuf {
        self.settings
            .config_root()
            .join(domain.dir_name())
            .join(suffix)
    }

    /// The watcher serving `domain`.
    pub fn watcher(&self, domain: ConfigDomain) -> &Arc<DirectoryWatcher> {
        match domain {
            ConfigDomain::Pipeline => &self.pipeline,
            ConfigDomain::Instance => &self.instance,
        }
    }
}

/// Idempotent directory creation: an already-existing directory is success,
/// anything else (permissions, collision with a non-directory) is surfaced.
fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| DiscoveryError::DirectoryCreate {
        path: path.to_path_buf(),
        source,
    })
}
