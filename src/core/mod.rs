//! Core configuration-discovery types.

mod domain;
mod provider;
pub(crate) mod snapshot;

pub use domain::ConfigDomain;
pub use provider::{ConfigProvider, SettingsProvider, StaticSettings};
pub use snapshot::{
    ChangeBatch, DomainSnapshot, FileRecord, FileState, Fingerprint, FingerprintMethod,
};
