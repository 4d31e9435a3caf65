use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

// -----------------------------------------------------------------------------
// ----- RelayError ------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RelayError {
    /// Upstream handshake failed or timed out. The browser socket gets closed.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A forward to an established upstream session failed. Fatal to the connection.
    #[error("upstream send failed: {0}")]
    UpstreamSendFailure(String),

    /// Browser frame did not decode as an event. The frame is dropped.
    #[error("malformed client frame ({reason}): {raw}")]
    MalformedClientFrame { raw: String, reason: String },

    #[error("browser send failed: {0}")]
    BrowserSendFailure(String),

    #[error("request handling failed: {0}")]
    RequestHandlingFailure(String),
}

impl RelayError {
    pub fn malformed(raw: &[u8], reason: impl Into<String>) -> Self {
        RelayError::MalformedClientFrame {
            raw: String::from_utf8_lossy(raw).into_owned(),
            reason: reason.into(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- RelayError: HTTP boundary ---------------------------------------------

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        tracing::error!("error occurred handling request: {self}");
        internal_server_error()
    }
}

/// The generic body every failed plain HTTP request gets.
pub fn internal_server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}

// -----------------------------------------------------------------------------
// ----- ConfigError -----------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable \"{}\" is missing.", crate::config::cli::API_KEY_ENV)]
    MissingCredential,

    #[error("upstream url must use ws:// or wss://, got {url}")]
    InvalidUpstreamUrl { url: String },

    #[error("{0}")]
    Args(#[source] clap::Error),

    #[error("config already initialized")]
    AlreadyInitialized,
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
