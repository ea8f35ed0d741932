use std::path::PathBuf;

use serde::Deserialize;

/// Voice used when the request omits one or sends a malformed value
pub const DEFAULT_VOICE: &str = "en-US-ChristopherNeural";
/// Speaking rate used when the request omits one or sends a malformed value
pub const DEFAULT_RATE: &str = "+0%";
/// Pitch offset used when the request omits one or sends a malformed value
pub const DEFAULT_PITCH: &str = "-2Hz";

/// Job working area and per-job limits
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    /// Directory holding `{id}.txt` / `{id}.mp3` artifacts while a job runs
    ///
    /// Defaults to `narrate` under the OS temp directory.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Maximum number of engine processes running at once
    #[serde(default)]
    pub max_concurrent: Option<usize>,
    /// Largest accepted text, in bytes
    #[serde(default = "default_max_text_bytes")]
    pub max_text_bytes: usize,
    /// Voice parameters applied when a request leaves them out
    #[serde(default)]
    pub defaults: VoiceDefaults,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            max_concurrent: None,
            max_text_bytes: default_max_text_bytes(),
            defaults: VoiceDefaults::default(),
        }
    }
}

impl JobsConfig {
    /// Resolved working directory
    pub fn working_dir(&self) -> PathBuf {
        self.working_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("narrate"))
    }
}

/// Default voice parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceDefaults {
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_rate")]
    pub rate: String,
    #[serde(default = "default_pitch")]
    pub pitch: String,
}

impl Default for VoiceDefaults {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            rate: default_rate(),
            pitch: default_pitch(),
        }
    }
}

const fn default_max_text_bytes() -> usize {
    100_000
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_rate() -> String {
    DEFAULT_RATE.to_string()
}

fn default_pitch() -> String {
    DEFAULT_PITCH.to_string()
}
