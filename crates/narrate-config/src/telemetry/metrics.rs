use serde::Deserialize;

use super::exporters::ExporterConfig;

/// Metric export settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Override the shared exporter for metrics
    #[serde(default)]
    pub exporter: Option<ExporterConfig>,
}
