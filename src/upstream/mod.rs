//! Upstream realtime service sessions.
//!
//! One [`UpstreamSession`] is bound to exactly one browser connection for its
//! whole lifetime. Sessions are handed out by an [`UpstreamConnector`], which
//! is the only thing shared across connections.

pub mod realtime;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::errors::RelayError;

pub use realtime::{RealtimeConnector, RealtimeSession};

// -----------------------------------------------------------------------------
// ----- Types -----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Disconnected,
    Connecting,
    Connected,
}

/// One event emitted by the upstream service, kept as the exact text it
/// arrived as so the browser sees it verbatim. `event_type` is `None` when the
/// JSON carries no string `type`; such events are still relayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    pub event_type: Option<String>,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    Event(ServerEvent),

    /// Delivered once, last, when the session terminates for any reason.
    Closed,
}

pub type EventStream = mpsc::UnboundedReceiver<UpstreamEvent>;

// -----------------------------------------------------------------------------
// ----- UpstreamSession -------------------------------------------------------

#[async_trait]
pub trait UpstreamSession: Send {
    /// Opens the session. Only the first call may succeed.
    async fn connect(&mut self) -> Result<(), RelayError>;

    /// Forwards one event. Callers must wait for `connect` first.
    async fn send(&mut self, event_type: &str, event: Map<String, Value>)
    -> Result<(), RelayError>;

    fn is_connected(&self) -> bool;

    /// Hands out the event stream. Returns `None` after the first call.
    fn take_events(&mut self) -> Option<EventStream>;

    /// Releases the session. Safe to call repeatedly.
    async fn disconnect(&mut self);
}

#[async_trait]
impl UpstreamSession for Box<dyn UpstreamSession> {
    async fn connect(&mut self) -> Result<(), RelayError> {
        (**self).connect().await
    }

    async fn send(
        &mut self,
        event_type: &str,
        event: Map<String, Value>,
    ) -> Result<(), RelayError> {
        (**self).send(event_type, event).await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn take_events(&mut self) -> Option<EventStream> {
        (**self).take_events()
    }

    async fn disconnect(&mut self) {
        (**self).disconnect().await
    }
}

// -----------------------------------------------------------------------------
// ----- UpstreamConnector -----------------------------------------------------

/// Builds a fresh, unconnected session per accepted browser connection.
pub trait UpstreamConnector: Send + Sync {
    fn session(&self) -> Box<dyn UpstreamSession>;
}
