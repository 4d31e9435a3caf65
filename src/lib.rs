pub mod config;
pub mod errors;
pub mod gateway;
pub mod registry;
pub mod relay;
pub mod upstream;

pub use config::Config;
pub use errors::{ConfigError, RelayError};
pub use gateway::{AppState, router, serve_connection};
pub use registry::{ConnectionLease, ConnectionRegistry};
pub use relay::{Relay, RelayOutcome, RelaySettings, RelayState};
