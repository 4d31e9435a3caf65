use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use tracing::debug;

use crate::errors::RelayError;

// -----------------------------------------------------------------------------
// ----- BrowserSocket ---------------------------------------------------------

/// The browser side of a relay.
#[async_trait]
pub trait BrowserSocket: Send {
    /// Next data frame, or `None` once the browser is gone. Must be cancel-safe.
    async fn recv(&mut self) -> Option<Bytes>;

    async fn send_text(&mut self, text: String) -> Result<(), RelayError>;

    async fn close(&mut self);
}

// -----------------------------------------------------------------------------
// ----- BrowserSocket: axum WebSocket -----------------------------------------

#[async_trait]
impl BrowserSocket for WebSocket {
    async fn recv(&mut self) -> Option<Bytes> {
        loop {
            match WebSocket::recv(self).await? {
                Ok(Message::Text(text)) => {
                    return Some(Bytes::copy_from_slice(text.as_str().as_bytes()));
                }
                Ok(Message::Binary(data)) => return Some(data),
                Ok(Message::Close(frame)) => {
                    debug!("browser sent close: {frame:?}");
                    return None;
                }

                // pings are answered by the socket itself
                Ok(Message::Ping(_) | Message::Pong(_)) => continue,

                Err(e) => {
                    debug!("browser read error: {e}");
                    return None;
                }
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), RelayError> {
        self.send(Message::Text(text.into()))
            .await
            .map_err(|e| RelayError::BrowserSendFailure(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.send(Message::Close(None)).await;
    }
}
