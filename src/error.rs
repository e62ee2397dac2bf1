//! Error types for config-discovery.

use std::io;
use std::path::PathBuf;

/// Result type alias for config-discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Errors that can occur while discovering or watching configuration.
///
/// Nothing in this crate treats these as fatal: directory-creation and scan
/// failures degrade to "this domain currently has no known configuration" and
/// are surfaced through logs rather than aborting agent startup.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// A configuration directory could not be created.
    #[error("failed to create config directory {path}: {source}")]
    DirectoryCreate {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying filesystem error.
        source: io::Error,
    },

    /// A registered directory could not be listed during a reconciliation
    /// cycle. The watcher treats this as "zero entries this cycle".
    #[error("failed to scan config directory {path}: {source}")]
    Scan {
        /// The directory that could not be listed.
        path: PathBuf,
        /// The underlying filesystem error.
        source: io::Error,
    },

    /// The filesystem notification backend failed.
    #[cfg(feature = "event-trigger")]
    #[error("file notification error: {0}")]
    Notify(#[from] notify::Error),
}
