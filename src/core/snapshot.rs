//! File records, fingerprints, and the scan/diff machinery behind a
//! watcher's last-reconciled view of a directory.

use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::core::ConfigDomain;
use crate::error::{DiscoveryError, Result};

/// How a file's modification fingerprint is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintMethod {
    /// Modification time plus size. Cheap, and sufficient for config files
    /// that are rewritten rather than patched in place.
    MtimeSize,

    /// Hash of the full file contents. Stronger, at the cost of reading
    /// every file each cycle.
    ContentHash,
}

impl Default for FingerprintMethod {
    fn default() -> Self {
        Self::MtimeSize
    }
}

/// A file's modification fingerprint. Two fingerprints comparing unequal is
/// what turns an entry into a `Modified` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fingerprint {
    /// Modification time and size, from directory metadata.
    MtimeSize {
        /// Last modification time, if the platform reports one.
        modified: Option<SystemTime>,
        /// File size in bytes.
        size: u64,
    },

    /// 64-bit hash of the file contents.
    ContentHash(u64),
}

/// The transition a file took in the most recent reconciliation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// Present now, absent in the previous cycle.
    New,

    /// Present in both cycles with an unchanged fingerprint.
    Unchanged,

    /// Present in both cycles with a changed fingerprint.
    Modified,

    /// Present in the previous cycle, absent now. Records in this state are
    /// removed from the snapshot once the transition has been delivered.
    Deleted,
}

/// One tracked file inside a [`DomainSnapshot`]. The file name is the
/// snapshot's map key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Fingerprint observed in the most recent scan.
    pub fingerprint: Fingerprint,

    /// Transition taken in the most recent cycle.
    pub state: FileState,
}

/// A watcher's last-reconciled view of one directory: file name to record.
///
/// Owned exclusively by the watcher and mutated only under the source's
/// snapshot mutex; consumers read it through
/// [`DirectoryWatcher::with_snapshot`](crate::watch::DirectoryWatcher::with_snapshot).
pub type DomainSnapshot = HashMap<String, FileRecord>;

/// The change set produced by one reconciliation cycle over one source.
///
/// Delivered to subscribers only when non-empty; name lists are sorted so
/// delivery order is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// The domain the source belongs to.
    pub domain: ConfigDomain,

    /// The watched directory the batch was produced from.
    pub dir: PathBuf,

    /// Files that appeared since the previous cycle.
    pub new: Vec<String>,

    /// Files whose fingerprint changed since the previous cycle.
    pub modified: Vec<String>,

    /// Files that disappeared since the previous cycle.
    pub deleted: Vec<String>,
}

impl ChangeBatch {
    /// True when the cycle observed no transitions.
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Total number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.new.len() + self.modified.len() + self.deleted.len()
    }
}

/// List the regular files directly inside `dir` and fingerprint each one.
///
/// The listing is flat: config directories hold files, not trees, and
/// subdirectories are ignored. Symlinks are followed, so a config file
/// linked into the directory (the usual shape of mounted config volumes)
/// is tracked like any other file. Entries whose metadata cannot be read
/// (removed mid-scan, dangling links) are skipped for this cycle and picked
/// up on the next.
pub(crate) fn scan_directory(
    dir: &Path,
    method: FingerprintMethod,
) -> Result<HashMap<String, Fingerprint>> {
    let entries = fs::read_dir(dir).map_err(|source| DiscoveryError::Scan {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut listing = HashMap::new();
    for entry in entries.flatten() {
        // fs::metadata resolves symlinks; DirEntry::file_type would not.
        let Ok(metadata) = fs::metadata(entry.path()) else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let fingerprint = match method {
            FingerprintMethod::MtimeSize => Fingerprint::MtimeSize {
                modified: metadata.modified().ok(),
                size: metadata.len(),
            },
            FingerprintMethod::ContentHash => {
                let Ok(contents) = fs::read(entry.path()) else {
                    continue;
                };
                Fingerprint::ContentHash(content_hash(&contents))
            }
        };

        listing.insert(name, fingerprint);
    }

    Ok(listing)
}

fn content_hash(contents: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    contents.hash(&mut hasher);
    hasher.finish()
}

/// Diff a fresh directory listing against the snapshot and apply the result.
///
/// Must be called with the source's snapshot mutex held; the work is pure
/// in-memory bookkeeping and completes in time proportional to the directory
/// size. Records whose `Deleted` transition is reported are removed from the
/// snapshot here, so a deletion is delivered exactly once.
pub(crate) fn reconcile(
    snapshot: &mut DomainSnapshot,
    listing: HashMap<String, Fingerprint>,
    domain: ConfigDomain,
    dir: &Path,
) -> ChangeBatch {
    let mut batch = ChangeBatch {
        domain,
        dir: dir.to_path_buf(),
        new: Vec::new(),
        modified: Vec::new(),
        deleted: Vec::new(),
    };

    let deleted: Vec<String> = snapshot
        .keys()
        .filter(|name| !listing.contains_key(*name))
        .cloned()
        .collect();
    for name in deleted {
        snapshot.remove(&name);
        batch.deleted.push(name);
    }

    for (name, fingerprint) in listing {
        match snapshot.get_mut(&name) {
            None => {
                snapshot.insert(
                    name.clone(),
                    FileRecord {
                        fingerprint,
                        state: FileState::New,
                    },
                );
                batch.new.push(name);
            }
            Some(record) if record.fingerprint != fingerprint => {
                record.fingerprint = fingerprint;
                record.state = FileState::Modified;
                batch.modified.push(name);
            }
            Some(record) => {
                record.state = FileState::Unchanged;
            }
        }
    }

    batch.new.sort_unstable();
    batch.modified.sort_unstable();
    batch.deleted.sort_unstable();
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn fp(size: u64) -> Fingerprint {
        Fingerprint::MtimeSize {
            modified: None,
            size,
        }
    }

    fn listing(entries: &[(&str, u64)]) -> HashMap<String, Fingerprint> {
        entries
            .iter()
            .map(|(name, size)| (name.to_string(), fp(*size)))
            .collect()
    }

    #[test]
    fn test_first_cycle_reports_everything_new() {
        let mut snapshot = DomainSnapshot::new();
        let batch = reconcile(
            &mut snapshot,
            listing(&[("a.yaml", 1), ("b.yaml", 2)]),
            ConfigDomain::Pipeline,
            Path::new("/cfg"),
        );

        assert_eq!(batch.new, vec!["a.yaml", "b.yaml"]);
        assert!(batch.modified.is_empty());
        assert!(batch.deleted.is_empty());
        assert_eq!(snapshot["a.yaml"].state, FileState::New);
    }

    #[test]
    fn test_unchanged_cycle_is_silent() {
        let mut snapshot = DomainSnapshot::new();
        let entries = [("a.yaml", 1), ("b.yaml", 2)];
        reconcile(
            &mut snapshot,
            listing(&entries),
            ConfigDomain::Pipeline,
            Path::new("/cfg"),
        );
        let batch = reconcile(
            &mut snapshot,
            listing(&entries),
            ConfigDomain::Pipeline,
            Path::new("/cfg"),
        );

        assert!(batch.is_empty());
        assert_eq!(snapshot["a.yaml"].state, FileState::Unchanged);
        assert_eq!(snapshot["b.yaml"].state, FileState::Unchanged);
    }

    #[test]
    fn test_batch_len_counts_all_transitions() {
        let mut snapshot = DomainSnapshot::new();
        reconcile(
            &mut snapshot,
            listing(&[("a.yaml", 1), ("b.yaml", 2)]),
            ConfigDomain::Pipeline,
            Path::new("/cfg"),
        );

        let batch = reconcile(
            &mut snapshot,
            listing(&[("a.yaml", 9), ("c.yaml", 3)]),
            ConfigDomain::Pipeline,
            Path::new("/cfg"),
        );
        assert_eq!(batch.len(), 3);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_fingerprint_change_is_modified() {
        let mut snapshot = DomainSnapshot::new();
        reconcile(
            &mut snapshot,
            listing(&[("a.yaml", 1), ("b.yaml", 2)]),
            ConfigDomain::Pipeline,
            Path::new("/cfg"),
        );
        let batch = reconcile(
            &mut snapshot,
            listing(&[("a.yaml", 9), ("b.yaml", 2)]),
            ConfigDomain::Pipeline,
            Path::new("/cfg"),
        );

        assert_eq!(batch.modified, vec!["a.yaml"]);
        assert!(batch.new.is_empty());
        assert!(batch.deleted.is_empty());
        assert_eq!(snapshot["a.yaml"].state, FileState::Modified);
        assert_eq!(snapshot["b.yaml"].state, FileState::Unchanged);
    }

    #[test]
    fn test_deletion_reported_once_then_forgotten() {
        let mut snapshot = DomainSnapshot::new();
        reconcile(
            &mut snapshot,
            listing(&[("a.yaml", 1), ("b.yaml", 2)]),
            ConfigDomain::Instance,
            Path::new("/cfg"),
        );

        let batch = reconcile(
            &mut snapshot,
            listing(&[("a.yaml", 1)]),
            ConfigDomain::Instance,
            Path::new("/cfg"),
        );
        assert_eq!(batch.deleted, vec!["b.yaml"]);
        assert!(!snapshot.contains_key("b.yaml"));

        let batch = reconcile(
            &mut snapshot,
            listing(&[("a.yaml", 1)]),
            ConfigDomain::Instance,
            Path::new("/cfg"),
        );
        assert!(batch.is_empty());
    }

    #[test]
    fn test_empty_listing_deletes_everything() {
        let mut snapshot = DomainSnapshot::new();
        reconcile(
            &mut snapshot,
            listing(&[("a.yaml", 1), ("b.yaml", 2)]),
            ConfigDomain::Pipeline,
            Path::new("/cfg"),
        );

        let batch = reconcile(
            &mut snapshot,
            HashMap::new(),
            ConfigDomain::Pipeline,
            Path::new("/cfg"),
        );
        assert_eq!(batch.deleted, vec!["a.yaml", "b.yaml"]);
        assert!(snapshot.is_empty());

        let batch = reconcile(
            &mut snapshot,
            HashMap::new(),
            ConfigDomain::Pipeline,
            Path::new("/cfg"),
        );
        assert!(batch.is_empty());
    }

    #[test]
    fn test_scan_lists_only_regular_files() {
        let temp_dir = TempDir::new().unwrap();
        File::create(temp_dir.path().join("p1.yaml")).unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();

        let listing = scan_directory(temp_dir.path(), FingerprintMethod::MtimeSize).unwrap();
        assert_eq!(listing.len(), 1);
        assert!(listing.contains_key("p1.yaml"));
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_follows_symlinked_config_files() {
        let storage = TempDir::new().unwrap();
        let target = storage.path().join("real.yaml");
        fs::write(&target, "enable: true\n").unwrap();

        let watched = TempDir::new().unwrap();
        std::os::unix::fs::symlink(&target, watched.path().join("linked.yaml")).unwrap();

        let listing = scan_directory(watched.path(), FingerprintMethod::MtimeSize).unwrap();
        assert!(listing.contains_key("linked.yaml"));
        assert_eq!(
            listing["linked.yaml"],
            Fingerprint::MtimeSize {
                modified: fs::metadata(&target).unwrap().modified().ok(),
                size: fs::metadata(&target).unwrap().len(),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_dangling_symlinks() {
        let watched = TempDir::new().unwrap();
        std::os::unix::fs::symlink(
            watched.path().join("gone.yaml"),
            watched.path().join("dangling.yaml"),
        )
        .unwrap();

        let listing = scan_directory(watched.path(), FingerprintMethod::MtimeSize).unwrap();
        assert!(listing.is_empty());
    }

    #[test]
    fn test_scan_missing_directory_errors() {
        let result = scan_directory(Path::new("/nonexistent/cfg"), FingerprintMethod::MtimeSize);
        assert!(matches!(result, Err(DiscoveryError::Scan { .. })));
    }

    #[test]
    fn test_content_hash_tracks_content_not_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.yaml");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "enable: true").unwrap();
        drop(f);

        let before = scan_directory(temp_dir.path(), FingerprintMethod::ContentHash).unwrap();
        fs::write(&path, "enable: false\n").unwrap();
        let after = scan_directory(temp_dir.path(), FingerprintMethod::ContentHash).unwrap();

        assert_ne!(before["a.yaml"], after["a.yaml"]);
    }
}
