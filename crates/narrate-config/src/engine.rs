use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

/// How the external synthesis engine is launched
///
/// The final command line is `program [script] [args...] <input> --output <output> --voice=.. --rate=.. --pitch=..`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Executable to spawn; a bare name is resolved through `PATH`
    #[serde(default = "default_program")]
    pub program: String,
    /// Script handed to `program` as its first argument (e.g. an interpreter script)
    ///
    /// Checked for existence before every spawn so a missing script surfaces
    /// as an unavailable engine rather than an execution failure.
    #[serde(default)]
    pub script: Option<PathBuf>,
    /// Extra leading arguments placed after the script
    #[serde(default)]
    pub args: Vec<String>,
    /// Maximum wall time for one engine run (e.g. "60s", "2m")
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            script: None,
            args: Vec::new(),
            timeout: default_timeout(),
        }
    }
}

impl EngineConfig {
    /// Parse the configured timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string is malformed or zero
    pub fn timeout_duration(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("engine.timeout", &self.timeout)
    }
}

fn default_program() -> String {
    "python3".to_string()
}

fn default_timeout() -> String {
    "60s".to_string()
}
