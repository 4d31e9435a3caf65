use clap::Parser;
use std::{path::PathBuf, time::Duration};

use super::types::LogLevel;
use crate::errors::ConfigError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_UPSTREAM_URL: &str = "wss://api.openai.com/v1/realtime";
const DEFAULT_UPSTREAM_MODEL: &str = "gpt-4o-realtime-preview-2024-10-01";

// -----------------------------------------------------------------------------
// ----- CliConfig -------------------------------------------------------------

/// Raw startup inputs after CLI/ENV parsing, before validation.
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub host: String,
    pub port: u16,
    pub log_level: LogLevel,
    pub api_key: Option<String>,
    pub upstream_url: String,
    pub upstream_model: String,
    pub status_path: String,
    pub static_dir: Option<PathBuf>,
    pub connect_timeout: Duration,
}

// -----------------------------------------------------------------------------
// ----- CliConfig: Static -----------------------------------------------------

impl CliConfig {
    pub fn from_env_and_args() -> Result<Self, ConfigError> {
        let args = Args::try_parse().map_err(ConfigError::Args)?;
        Ok(args.into())
    }

    pub fn from_args_iter<I, T>(iter: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let args = Args::try_parse_from(iter).map_err(ConfigError::Args)?;
        Ok(args.into())
    }
}

// -----------------------------------------------------------------------------
// ----- Args ------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "relaycrab",
    version,
    about = "WebSocket relay between browsers and a realtime speech service"
)]
struct Args {
    // Hostname or IP literal; resolved once at bind time.
    #[arg(long = "host", short = 'H', env = "WEBSITE_HOSTNAME", default_value = "localhost")]
    host: String,

    #[arg(long = "port", short = 'p', env = "PORT", default_value_t = 3000)]
    port: u16,

    // Not required via CLI or ENV (defaults to info).
    #[arg(long = "log", default_value = "info")]
    log_level: LogLevel,

    // Optional here so a missing key surfaces as our own diagnostic, not clap's.
    #[arg(long = "api-key", env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long = "upstream-url", env = "RELAY_UPSTREAM_URL", default_value = DEFAULT_UPSTREAM_URL)]
    upstream_url: String,

    #[arg(long = "model", env = "RELAY_UPSTREAM_MODEL", default_value = DEFAULT_UPSTREAM_MODEL)]
    upstream_model: String,

    #[arg(long = "status-path", env = "RELAY_STATUS_PATH", default_value = "/api/ws")]
    status_path: String,

    #[arg(long = "static-dir", env = "RELAY_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    // humantime, e.g. "30s", "2m". "0s" disables the bound.
    #[arg(
        long = "connect-timeout",
        env = "RELAY_CONNECT_TIMEOUT",
        default_value = "30s",
        value_parser = humantime::parse_duration
    )]
    connect_timeout: Duration,
}

impl From<Args> for CliConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            log_level: args.log_level,
            api_key: args.api_key,
            upstream_url: args.upstream_url,
            upstream_model: args.upstream_model,
            status_path: args.status_path,
            static_dir: args.static_dir,
            connect_timeout: args.connect_timeout,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
