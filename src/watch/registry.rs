//! The per-domain set of registered configuration sources.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::core::snapshot::DomainSnapshot;

/// One registered configuration source: a watched directory plus the mutex
/// guarding its snapshot.
///
/// The registry owns the synchronization primitive; callers supply only the
/// path and read the snapshot through scoped accessors, never through a raw
/// lock handle.
pub struct WatchSource {
    path: PathBuf,
    snapshot: Mutex<DomainSnapshot>,
}

impl WatchSource {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            snapshot: Mutex::new(DomainSnapshot::new()),
        }
    }

    /// The watched directory, normalized at registration time.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The mutex guarding this source's snapshot. Crate-internal: external
    /// readers go through `DirectoryWatcher::with_snapshot`.
    pub(crate) fn snapshot(&self) -> &Mutex<DomainSnapshot> {
        &self.snapshot
    }
}

/// Append-only set of [`WatchSource`]s for one domain.
///
/// Registration is idempotent: the same path registered twice is a silent
/// no-op, so repeated initialization (e.g. re-init on restart) never
/// duplicates watch targets. The internal lock here is distinct from any
/// per-source snapshot mutex and is held only for the membership check and
/// append, so registration never waits on an in-progress scan.
pub struct SourceRegistry {
    sources: Mutex<Vec<Arc<WatchSource>>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sources: Mutex::new(Vec::new()),
        }
    }

    /// Add `path` to the source set if not already present.
    ///
    /// Paths are compared by normalized absolute path: canonicalized when the
    /// directory exists, literal otherwise (a directory whose creation failed
    /// can still be registered and will simply scan as empty until it
    /// appears). Returns `true` when the path was newly added.
    pub fn register(&self, path: impl Into<PathBuf>) -> bool {
        let path = normalize(&path.into());

        let mut sources = self.sources.lock();
        if sources.iter().any(|source| source.path == path) {
            debug!(path = %path.display(), "source already registered, ignoring");
            return false;
        }
        sources.push(Arc::new(WatchSource::new(path)));
        true
    }

    /// The current source set. Used by the owning watcher's reconciliation
    /// loop; the returned handles stay valid for the process lifetime.
    pub fn list(&self) -> Vec<Arc<WatchSource>> {
        self.sources.lock().clone()
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.lock().len()
    }

    /// True when no source has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.sources.lock().is_empty()
    }

    /// Find the registered source for `path`, if any.
    pub(crate) fn find(&self, path: &Path) -> Option<Arc<WatchSource>> {
        let path = normalize(path);
        self.sources
            .lock()
            .iter()
            .find(|source| source.path == path)
            .cloned()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve symlinks and relative components where possible. Falls back to the
/// literal path when the directory does not exist yet.
fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
