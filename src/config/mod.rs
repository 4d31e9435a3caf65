pub mod cli;
pub mod config;
pub mod types;

pub use cli::CliConfig;
pub use config::{Config, UpstreamConfig};
pub use types::LogLevel;
