use once_cell::sync::OnceCell;
use secrecy::{ExposeSecret, SecretString};
use std::{path::PathBuf, time::Duration};

use super::{cli::CliConfig, types::LogLevel};
use crate::errors::ConfigError;

// -----------------------------------------------------------------------------
// ----- Global Singleton ------------------------------------------------------

static ROOT_CONFIG: OnceCell<Config> = OnceCell::new();

// -----------------------------------------------------------------------------
// ----- Config ----------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: LogLevel,
    pub status_path: String,
    pub static_dir: Option<PathBuf>,
    pub upstream: UpstreamConfig,
}

#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub url: String,
    pub model: String,
    pub api_key: SecretString,

    /// `None` leaves the handshake unbounded.
    pub connect_timeout: Option<Duration>,
}

// -----------------------------------------------------------------------------
// ----- Config: Static --------------------------------------------------------

impl Config {
    /// Reads CLI/ENV once and freezes the result. Nothing is bound or spawned
    /// before this succeeds.
    pub fn init() -> Result<(), ConfigError> {
        let cli = CliConfig::from_env_and_args()?;
        let config = Self::from_cli(cli)?;

        ROOT_CONFIG
            .set(config)
            .map_err(|_| ConfigError::AlreadyInitialized)
    }

    pub fn snapshot() -> Config {
        ROOT_CONFIG
            .get()
            .expect("Config not initialized; call Config::init() first")
            .clone()
    }

    pub fn from_cli(cli: CliConfig) -> Result<Config, ConfigError> {
        let api_key = cli
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingCredential)?;

        if !(cli.upstream_url.starts_with("ws://") || cli.upstream_url.starts_with("wss://")) {
            return Err(ConfigError::InvalidUpstreamUrl {
                url: cli.upstream_url,
            });
        }

        let status_path = if cli.status_path.starts_with('/') {
            cli.status_path
        } else {
            format!("/{}", cli.status_path)
        };

        Ok(Config {
            host: cli.host,
            port: cli.port,
            log_level: cli.log_level,
            status_path,
            static_dir: cli.static_dir,
            upstream: UpstreamConfig {
                url: cli.upstream_url,
                model: cli.upstream_model,
                api_key: SecretString::new(api_key.into_boxed_str()),
                connect_timeout: (!cli.connect_timeout.is_zero()).then_some(cli.connect_timeout),
            },
        })
    }
}

// -----------------------------------------------------------------------------
// ----- UpstreamConfig: Public ------------------------------------------------

impl UpstreamConfig {
    pub fn endpoint(&self) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{sep}model={}", self.url, self.model)
    }

    pub fn api_key_exposed(&self) -> &str {
        self.api_key.expose_secret()
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
