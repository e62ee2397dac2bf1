//! # config-discovery
//!
//! On-disk configuration discovery and change watching for telemetry agents.
//!
//! ## Overview
//!
//! A collection agent keeps two independent families of configuration on
//! disk: *pipeline* configuration (collection/processing/flushing topologies)
//! and *instance* configuration (agent-wide runtime settings). This crate
//! locates both, ensures their storage directories exist, and hands each
//! directory to a watcher that detects file-level changes and republishes
//! them to the rest of the agent:
//!
//! - One [`DirectoryWatcher`](watch::DirectoryWatcher) per
//!   [`ConfigDomain`](core::ConfigDomain), driven by a periodic
//!   reconciliation loop (scan, diff, apply, publish).
//! - Idempotent source registration: re-initializing never duplicates watch
//!   targets.
//! - Tear-free reads: consumers see a pre-apply or post-apply snapshot,
//!   never a mix.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use config_discovery::prelude::*;
//!
//! # async fn example() {
//! let settings = Arc::new(StaticSettings::new("/etc/agent/config"));
//! let pipeline = Arc::new(DirectoryWatcher::new(ConfigDomain::Pipeline));
//! let instance = Arc::new(DirectoryWatcher::new(ConfigDomain::Instance));
//!
//! let provider = ConfigProvider::new(settings, pipeline.clone(), instance.clone());
//! provider.initialize("default");
//!
//! let _sub = pipeline.subscribe(|batch| {
//!     println!("pipeline configs changed: {:?}", batch.new);
//! });
//!
//! pipeline.spawn();
//! instance.spawn();
//! # }
//! ```
//!
//! Parsing the discovered files and building pipelines/instances from them is
//! the consumer's job; this crate only reports which files appeared, changed,
//! or disappeared.

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod metrics;
pub mod watch;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{ConfigDomain, ConfigProvider, SettingsProvider, StaticSettings};
    pub use crate::error::{DiscoveryError, Result};
    pub use crate::watch::{ChangeBatch, DirectoryWatcher, WatcherConfig};
}
