//! Programmatic configuration builder for integration tests

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use narrate_config::{Config, CorsConfig, DeliveryConfig, ReferencedConfig};

/// Builder for constructing test configurations rooted in a scratch directory
pub struct ConfigBuilder {
    config: Config,
    root: PathBuf,
}

impl ConfigBuilder {
    /// Create a builder whose working area lives under `root`
    ///
    /// `engine` is a shell script, run through `/bin/sh`
    pub fn new(root: &Path, engine: &Path) -> Self {
        let mut config = Config::default();
        config.server.listen_address = Some(SocketAddr::from(([127, 0, 0, 1], 0)));
        config.engine.program = "/bin/sh".to_string();
        config.engine.script = Some(engine.to_path_buf());
        config.engine.timeout = "10s".to_string();
        config.jobs.working_dir = Some(root.join("work"));

        Self {
            config,
            root: root.to_path_buf(),
        }
    }

    /// Switch to referenced delivery, publishing under `<root>/public`
    pub fn with_referenced_delivery(mut self) -> Self {
        self.config.delivery = DeliveryConfig::Referenced(ReferencedConfig {
            public_dir: self.root.join("public"),
            url_prefix: "/audio".to_string(),
            retention: None,
            sweep_interval: "10m".to_string(),
        });
        self
    }

    /// Set the engine time budget
    pub fn with_timeout(mut self, timeout: &str) -> Self {
        self.config.engine.timeout = timeout.to_string();
        self
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config.validate().expect("test config is valid");
        self.config
    }
}
