use std::{path::Path, time::Duration};

use crate::{Config, DeliveryConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if placeholder expansion, parsing or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_engine()?;
        self.validate_jobs()?;
        self.validate_delivery()?;
        Ok(())
    }

    fn validate_engine(&self) -> anyhow::Result<()> {
        if self.engine.program.trim().is_empty() {
            anyhow::bail!("engine.program must not be empty");
        }

        self.engine.timeout_duration()?;

        Ok(())
    }

    fn validate_jobs(&self) -> anyhow::Result<()> {
        if self.jobs.max_concurrent == Some(0) {
            anyhow::bail!("jobs.max_concurrent must be greater than 0");
        }

        if self.jobs.max_text_bytes == 0 {
            anyhow::bail!("jobs.max_text_bytes must be greater than 0");
        }

        Ok(())
    }

    fn validate_delivery(&self) -> anyhow::Result<()> {
        let DeliveryConfig::Referenced(ref referenced) = self.delivery else {
            return Ok(());
        };

        let prefix = referenced.url_prefix.as_str();
        if !prefix.starts_with('/') || prefix.trim_end_matches('/').is_empty() {
            anyhow::bail!("delivery.url_prefix must be an absolute path other than '/', got '{prefix}'");
        }

        if referenced.public_dir == self.jobs.working_dir() {
            anyhow::bail!("delivery.public_dir must differ from jobs.working_dir");
        }

        referenced.retention_duration()?;
        referenced.sweep_interval_duration()?;

        let health = &self.server.health;
        if health.enabled && health.path.starts_with(prefix.trim_end_matches('/')) {
            tracing::warn!(
                health_path = %health.path,
                url_prefix = prefix,
                "health endpoint is shadowed by the public audio mount"
            );
        }

        Ok(())
    }
}

/// Parse a human-readable duration and reject zero
pub(crate) fn parse_duration(field: &str, value: &str) -> anyhow::Result<Duration> {
    let duration =
        duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration for {field} '{value}': {e}"))?;

    if duration.is_zero() {
        anyhow::bail!("{field} must be greater than zero");
    }

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use std::{io::Write, time::Duration};

    use crate::{Config, DeliveryConfig};

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.engine.program, "python3");
        assert!(matches!(config.delivery, DeliveryConfig::Buffered(_)));
        assert!(config.server.health.enabled);
        assert!(config.telemetry.is_none());
    }

    #[test]
    fn load_reads_file_and_expands_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[engine]
program = "{{{{ env.NARRATE_LOADER_PROGRAM }}}}"
timeout = "45s"

[jobs]
max_concurrent = 2
"#
        )
        .unwrap();

        temp_env::with_var("NARRATE_LOADER_PROGRAM", Some("/usr/local/bin/tts"), || {
            let config = Config::load(file.path()).unwrap();
            assert_eq!(config.engine.program, "/usr/local/bin/tts");
            assert_eq!(config.engine.timeout_duration().unwrap(), Duration::from_secs(45));
            assert_eq!(config.jobs.max_concurrent, Some(2));
        });
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Config::load(std::path::Path::new("/nonexistent/narrate.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn unknown_section_is_rejected() {
        let err = Config::from_toml("[llm]\nenabled = true").unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn empty_program_is_rejected() {
        let err = Config::from_toml("[engine]\nprogram = \"  \"").unwrap_err();
        assert!(err.to_string().contains("engine.program"));
    }

    #[test]
    fn malformed_timeout_is_rejected() {
        let err = Config::from_toml("[engine]\ntimeout = \"soon\"").unwrap_err();
        assert!(err.to_string().contains("engine.timeout"));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = Config::from_toml("[jobs]\nmax_concurrent = 0").unwrap_err();
        assert!(err.to_string().contains("max_concurrent"));
    }

    #[test]
    fn root_url_prefix_is_rejected() {
        let toml = r#"
            [delivery]
            strategy = "referenced"
            public_dir = "/srv/audio"
            url_prefix = "/"
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("url_prefix"));
    }

    #[test]
    fn public_dir_must_differ_from_working_dir() {
        let toml = r#"
            [jobs]
            working_dir = "/var/tmp/narrate"

            [delivery]
            strategy = "referenced"
            public_dir = "/var/tmp/narrate"
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("public_dir"));
    }

    #[test]
    fn malformed_retention_is_rejected() {
        let toml = r#"
            [delivery]
            strategy = "referenced"
            public_dir = "/srv/audio"
            retention = "forever"
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("delivery.retention"));
    }

    #[test]
    fn buffered_delivery_rejects_referenced_settings() {
        let toml = r#"
            [delivery]
            strategy = "buffered"
            retention = "24h"
            public_dir = "public/audio"
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(format!("{err:#}").contains("unknown field"));
    }
}
