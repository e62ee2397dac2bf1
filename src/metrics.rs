//! Metric and label names for the configuration-discovery subsystem.
//!
//! Pure data: the reporting pipeline lives elsewhere in the agent, this
//! module only fixes the names so every exporter agrees on them.

use crate::core::ConfigDomain;

/// Label key: which config domain a metric was recorded for.
pub const METRIC_LABEL_KEY_CONFIG_DOMAIN: &str = "config_domain";

/// Label key: the watched source directory a metric was recorded for.
pub const METRIC_LABEL_KEY_CONFIG_SOURCE_DIR: &str = "config_source_dir";

/// Gauge: number of pipeline config files currently known to the agent.
pub const METRIC_AGENT_PIPELINE_CONFIG_TOTAL: &str = "agent_pipeline_config_total";

/// Gauge: number of instance config files currently known to the agent.
pub const METRIC_AGENT_INSTANCE_CONFIG_TOTAL: &str = "agent_instance_config_total";

/// Counter: config files that appeared, per reconciliation cycle.
pub const METRIC_CONFIG_NEW_TOTAL: &str = "agent_config_new_total";

/// Counter: config files whose fingerprint changed, per reconciliation cycle.
pub const METRIC_CONFIG_MODIFIED_TOTAL: &str = "agent_config_modified_total";

/// Counter: config files that disappeared, per reconciliation cycle.
pub const METRIC_CONFIG_DELETED_TOTAL: &str = "agent_config_deleted_total";

/// The per-domain "configs currently known" gauge name.
pub fn config_total_metric(domain: ConfigDomain) -> &'static str {
    match domain {
        ConfigDomain::Pipeline => METRIC_AGENT_PIPELINE_CONFIG_TOTAL,
        ConfigDomain::Instance => METRIC_AGENT_INSTANCE_CONFIG_TOTAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_gauge_names() {
        assert_eq!(
            config_total_metric(ConfigDomain::Pipeline),
            "agent_pipeline_config_total"
        );
        assert_eq!(
            config_total_metric(ConfigDomain::Instance),
            "agent_instance_config_total"
        );
    }
}
