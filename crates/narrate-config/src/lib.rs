#![allow(clippy::must_use_candidate)]

pub mod cors;
pub mod delivery;
pub mod engine;
mod env;
pub mod health;
pub mod jobs;
mod loader;
pub mod server;
pub mod telemetry;

use serde::Deserialize;

pub(crate) use loader::parse_duration;

pub use cors::*;
pub use delivery::*;
pub use engine::*;
pub use health::*;
pub use jobs::*;
pub use server::*;
pub use telemetry::TelemetryConfig;

/// Top-level narrate configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// External synthesis engine invocation
    #[serde(default)]
    pub engine: EngineConfig,
    /// Job working area, limits and voice defaults
    #[serde(default)]
    pub jobs: JobsConfig,
    /// How synthesized audio is handed back to callers
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
