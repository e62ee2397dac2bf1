//! Directory watching: source registration, the reconciliation loop, and
//! change-batch delivery.

mod registry;
mod subscriber;
mod watcher;

#[cfg(feature = "event-trigger")]
mod trigger;

pub use registry::{SourceRegistry, WatchSource};
pub use subscriber::{SubscriberRegistry, SubscriptionHandle};
pub use watcher::{DirectoryWatcher, WatcherConfig};

#[cfg(feature = "event-trigger")]
pub use trigger::ReconcileTrigger;

pub use crate::core::ChangeBatch;
