//! The two configuration families tracked by the agent.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two independent configuration families an agent keeps on disk.
///
/// Each domain owns its own storage subdirectory and its own
/// [`DirectoryWatcher`](crate::watch::DirectoryWatcher); pipeline and
/// instance configuration change streams are fully independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigDomain {
    /// Collection/processing/flushing topology configuration.
    Pipeline,

    /// Agent-wide runtime settings.
    Instance,
}

impl ConfigDomain {
    /// Both domains, in a fixed iteration order.
    pub const ALL: [ConfigDomain; 2] = [ConfigDomain::Pipeline, ConfigDomain::Instance];

    /// The storage subdirectory name for this domain under the config root.
    pub fn dir_name(self) -> &'static str {
        match self {
            ConfigDomain::Pipeline => "pipeline_config",
            ConfigDomain::Instance => "instance_config",
        }
    }
}

impl fmt::Display for ConfigDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigDomain::Pipeline => write!(f, "pipeline"),
            ConfigDomain::Instance => write!(f, "instance"),
        }
    }
}
