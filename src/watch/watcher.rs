//! The per-domain reconciliation loop.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::core::snapshot::{self, DomainSnapshot};
use crate::core::{ChangeBatch, ConfigDomain, FingerprintMethod};
use crate::watch::registry::{SourceRegistry, WatchSource};
use crate::watch::subscriber::{SubscriberRegistry, SubscriptionHandle};

/// Tunables for a [`DirectoryWatcher`].
///
/// Neither value is a correctness property: the reconciliation semantics hold
/// for any cadence and either fingerprint method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Time between reconciliation cycles.
    pub poll_interval: Duration,

    /// How file fingerprints are computed.
    pub fingerprint: FingerprintMethod,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            fingerprint: FingerprintMethod::default(),
        }
    }
}

/// Watches the registered directories of one config domain for file-level
/// changes.
///
/// The watcher owns a [`SourceRegistry`] and, per source, the last-reconciled
/// [`DomainSnapshot`] together with the mutex guarding it. Each cycle scans a
/// directory (off the snapshot lock, on the blocking pool), diffs the listing
/// against the snapshot, applies the result under the lock, and then
/// publishes the non-empty [`ChangeBatch`] to subscribers.
///
/// Construct one watcher per domain and share it behind an [`Arc`]; there is
/// deliberately no global instance, so tests and embedders control the
/// lifecycle.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use config_discovery::core::ConfigDomain;
/// use config_discovery::watch::DirectoryWatcher;
///
/// # async fn example() {
/// let watcher = Arc::new(DirectoryWatcher::new(ConfigDomain::Pipeline));
/// watcher.register("/etc/agent/config/pipeline_config/default");
///
/// let _sub = watcher.subscribe(|batch| {
///     for name in &batch.new {
///         println!("new pipeline config: {name}");
///     }
/// });
///
/// watcher.spawn();
/// # }
/// ```
pub struct DirectoryWatcher {
    domain: ConfigDomain,
    config: WatcherConfig,
    registry: SourceRegistry,
    subscribers: SubscriberRegistry,
}

impl DirectoryWatcher {
    /// Create a watcher for `domain` with default tunables.
    pub fn new(domain: ConfigDomain) -> Self {
        Self::with_config(domain, WatcherConfig::default())
    }

    /// Create a watcher for `domain` with explicit tunables.
    pub fn with_config(domain: ConfigDomain, config: WatcherConfig) -> Self {
        Self {
            domain,
            config,
            registry: SourceRegistry::new(),
            subscribers: SubscriberRegistry::new(),
        }
    }

    /// The domain this watcher serves.
    pub fn domain(&self) -> ConfigDomain {
        self.domain
    }

    /// Register a directory as a source for this domain.
    ///
    /// Idempotent: re-registering the same path is a silent no-op. The
    /// directory need not exist yet; a missing directory scans as empty
    /// until it appears. Returns `true` when the source was newly added.
    pub fn register(&self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        let added = self.registry.register(&path);
        if added {
            info!(domain = %self.domain, path = %path.display(), "registered config source");
        }
        added
    }

    /// The directories currently registered with this watcher.
    pub fn sources(&self) -> Vec<PathBuf> {
        self.registry
            .list()
            .iter()
            .map(|source| source.path().to_path_buf())
            .collect()
    }

    /// Subscribe to this watcher's change batches.
    ///
    /// Keep the returned handle alive for as long as delivery is wanted;
    /// dropping it unsubscribes.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ChangeBatch) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Read the current snapshot for the source at `dir` under its mutex.
    ///
    /// The closure runs with the snapshot lock held, so it observes either a
    /// fully pre-apply or fully post-apply state, never a cycle mid-update.
    /// Returns `None` when `dir` is not a registered source.
    pub fn with_snapshot<R>(&self, dir: &Path, f: impl FnOnce(&DomainSnapshot) -> R) -> Option<R> {
        let source = self.registry.find(dir)?;
        let snapshot = source.snapshot().lock();
        Some(f(&snapshot))
    }

    /// Run one reconciliation cycle over every registered source.
    ///
    /// Cycles are strictly sequential per watcher: the next source's scan
    /// starts only after the previous source's apply and publish completed.
    /// Exposed so embedders and tests can drive reconciliation
    /// deterministically instead of waiting out the poll interval.
    pub async fn reconcile(&self) {
        for source in self.registry.list() {
            self.reconcile_source(&source).await;
        }
    }

    async fn reconcile_source(&self, source: &Arc<WatchSource>) {
        let dir = source.path().to_path_buf();
        let method = self.config.fingerprint;

        let scan_dir = dir.clone();
        let scanned =
            tokio::task::spawn_blocking(move || snapshot::scan_directory(&scan_dir, method)).await;

        let listing = match scanned {
            Ok(Ok(listing)) => listing,
            Ok(Err(e)) => {
                // Unlistable directories yield zero entries, so consumers
                // are told their configs disappeared instead of reading a
                // stale snapshot forever.
                warn!(domain = %self.domain, error = %e, "scan failed, treating directory as empty");
                HashMap::new()
            }
            Err(e) => {
                error!(domain = %self.domain, error = %e, "scan task failed");
                return;
            }
        };

        let batch = {
            let mut snapshot = source.snapshot().lock();
            snapshot::reconcile(&mut snapshot, listing, self.domain, &dir)
        };

        if !batch.is_empty() {
            debug!(
                domain = %self.domain,
                dir = %dir.display(),
                changes = batch.len(),
                new = batch.new.len(),
                modified = batch.modified.len(),
                deleted = batch.deleted.len(),
                "publishing change batch"
            );
            self.subscribers.notify(&batch);
        }
    }

    /// Spawn the background reconciliation loop.
    ///
    /// The task runs until process shutdown (or until the returned handle is
    /// aborted), cycling at the configured poll interval. Sources registered
    /// after spawning are picked up on the next cycle.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        self.spawn_with_trigger(None)
    }

    /// Spawn the reconciliation loop with an optional early-wake channel.
    ///
    /// A ping on `trigger` starts a cycle immediately instead of waiting for
    /// the next interval tick; see
    /// [`ReconcileTrigger`](crate::watch::ReconcileTrigger) for a debounced,
    /// notification-backed producer. A closed channel falls back to plain
    /// interval polling.
    pub fn spawn_with_trigger(
        self: &Arc<Self>,
        trigger: Option<mpsc::Receiver<()>>,
    ) -> JoinHandle<()> {
        let watcher = Arc::clone(self);
        let mut trigger = trigger;

        tokio::spawn(async move {
            info!(domain = %watcher.domain, "directory watcher started");
            let mut interval = tokio::time::interval(watcher.config.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let mut trigger_closed = false;
                match trigger {
                    Some(ref mut rx) => {
                        tokio::select! {
                            _ = interval.tick() => {}
                            ping = rx.recv() => {
                                if ping.is_none() {
                                    trigger_closed = true;
                                }
                            }
                        }
                    }
                    None => {
                        interval.tick().await;
                    }
                }
                if trigger_closed {
                    trigger = None;
                }

                watcher.reconcile().await;
            }
        })
    }
}
