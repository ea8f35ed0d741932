use std::path::PathBuf;

use clap::Parser;

/// Narrate text-to-speech job server
#[derive(Debug, Parser)]
#[command(name = "narrate", about = "Runs a text-to-speech engine per HTTP request and returns the audio")]
pub struct Args {
    /// Path to configuration file; built-in defaults are used when omitted
    #[arg(short, long, env = "NARRATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long, env = "NARRATE_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,

    /// Log filter directive, e.g. `info` or `narrate_jobs=debug`
    #[arg(long, default_value = "info", env = "NARRATE_LOG")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "NARRATE_LOG_JSON")]
    pub log_json: bool,
}
