use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

/// Result delivery strategy, fixed for the lifetime of a deployment
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DeliveryConfig {
    /// Return the audio bytes as the response body
    Buffered(BufferedConfig),
    /// Publish the audio under a served directory and return its URL
    Referenced(ReferencedConfig),
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self::Buffered(BufferedConfig::default())
    }
}

/// Settings for buffered delivery
///
/// There are none; the struct exists so that keys belonging to referenced
/// delivery are rejected instead of silently ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferedConfig {}

/// Settings for referenced delivery
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferencedConfig {
    /// Directory that finished `{id}.mp3` files are moved into
    pub public_dir: PathBuf,
    /// URL path the public directory is mounted at
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Age after which published files are deleted; unset keeps them forever
    #[serde(default)]
    pub retention: Option<String>,
    /// How often the retention sweep runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: String,
}

impl ReferencedConfig {
    /// Parsed retention window, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string is malformed or zero
    pub fn retention_duration(&self) -> anyhow::Result<Option<Duration>> {
        self.retention
            .as_deref()
            .map(|value| crate::parse_duration("delivery.retention", value))
            .transpose()
    }

    /// Parsed sweep interval
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string is malformed or zero
    pub fn sweep_interval_duration(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("delivery.sweep_interval", &self.sweep_interval)
    }
}

fn default_url_prefix() -> String {
    "/audio".to_string()
}

fn default_sweep_interval() -> String {
    "10m".to_string()
}
