//! Filesystem-notification wake-ups for the reconciliation loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::debug;

use crate::error::Result;

/// Debounced filesystem-event source that wakes a watcher's reconciliation
/// loop early.
///
/// Polling remains the source of truth for change detection; the trigger
/// only shortens the latency between a file landing on disk and the cycle
/// that reports it. Pair the receiver with
/// [`DirectoryWatcher::spawn_with_trigger`](crate::watch::DirectoryWatcher::spawn_with_trigger).
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use config_discovery::core::ConfigDomain;
/// use config_discovery::watch::{DirectoryWatcher, ReconcileTrigger};
///
/// # async fn example() -> config_discovery::error::Result<()> {
/// let watcher = Arc::new(DirectoryWatcher::new(ConfigDomain::Pipeline));
/// watcher.register("/etc/agent/config/pipeline_config/default");
///
/// let (trigger, rx) = ReconcileTrigger::new(Duration::from_millis(500))?;
/// trigger.watch("/etc/agent/config/pipeline_config/default")?;
/// watcher.spawn_with_trigger(Some(rx));
/// # Ok(())
/// # }
/// ```
pub struct ReconcileTrigger {
    watcher: Mutex<RecommendedWatcher>,
    debounce: Duration,
    watched: Mutex<Vec<PathBuf>>,
}

impl ReconcileTrigger {
    /// Create a new trigger.
    ///
    /// `debounce` is the minimum time between pings; bursts of filesystem
    /// events within the window collapse into one wake-up. Must be called
    /// from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying file watcher cannot be created.
    pub fn new(debounce: Duration) -> Result<(Self, mpsc::Receiver<()>)> {
        let (tx, rx) = mpsc::channel(16);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                // Creations, modifications, and removals all warrant an
                // early cycle; access events do not.
                if matches!(
                    event.kind,
                    notify::EventKind::Create(_)
                        | notify::EventKind::Modify(_)
                        | notify::EventKind::Remove(_)
                ) {
                    let _ = event_tx.send(event);
                }
            }
        })?;

        let window = debounce;
        tokio::spawn(async move {
            // An event inside the window (including the first after startup)
            // is delivered through the delayed path below. `pending` collapses
            // a burst of in-window events into that one delayed ping.
            let mut last_ping = tokio::time::Instant::now();
            let pending = Arc::new(AtomicBool::new(false));

            while let Some(_event) = event_rx.recv().await {
                let now = tokio::time::Instant::now();
                let elapsed = now.duration_since(last_ping);

                if elapsed >= window {
                    if tx.send(()).await.is_err() {
                        break;
                    }
                    last_ping = now;
                } else if !pending.swap(true, Ordering::SeqCst) {
                    let remaining = window - elapsed;
                    let tx_clone = tx.clone();
                    let pending = Arc::clone(&pending);
                    tokio::spawn(async move {
                        sleep(remaining).await;
                        pending.store(false, Ordering::SeqCst);
                        let _ = tx_clone.send(()).await;
                    });
                }
            }
        });

        Ok((
            Self {
                watcher: Mutex::new(watcher),
                debounce,
                watched: Mutex::new(Vec::new()),
            },
            rx,
        ))
    }

    /// Start producing wake-ups for changes directly under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be watched (e.g. it does not
    /// exist yet; register it again once it has been created).
    pub fn watch(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());

        self.watcher
            .lock()
            .watch(&canonical, RecursiveMode::NonRecursive)?;

        let mut watched = self.watched.lock();
        if !watched.contains(&canonical) {
            debug!(dir = %canonical.display(), "trigger watching directory");
            watched.push(canonical);
        }
        Ok(())
    }

    /// Stop producing wake-ups for `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path was not being watched.
    pub fn unwatch(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());

        self.watcher.lock().unwatch(&canonical)?;
        self.watched.lock().retain(|p| p != &canonical);
        Ok(())
    }

    /// The configured debounce window.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Directories currently producing wake-ups.
    pub fn watched(&self) -> Vec<PathBuf> {
        self.watched.lock().clone()
    }
}
