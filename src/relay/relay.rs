use bytes::Bytes;
use std::time::Duration;
use tokio::{select, time::timeout};
use tracing::{debug, error, info, warn};

use super::{
    event::ClientEvent,
    pending::PendingFrames,
    socket::BrowserSocket,
    state::{RelayOutcome, RelayState},
};
use crate::errors::RelayError;
use crate::registry::ConnectionLease;
use crate::upstream::{EventStream, UpstreamEvent, UpstreamSession};

// -----------------------------------------------------------------------------
// ----- RelaySettings ---------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RelaySettings {
    /// Upper bound on the upstream handshake. `None` waits forever.
    pub connect_timeout: Option<Duration>,
}

// -----------------------------------------------------------------------------
// ----- Relay -----------------------------------------------------------------

/// Owns one browser socket and its upstream session.
///
/// Browser frames that arrive while the upstream session is connecting are
/// queued and drained in order before any later frame is read, so the
/// upstream side sees every client frame exactly once, in arrival order.
#[derive(Debug)]
pub struct Relay<B, U> {
    lease: ConnectionLease,
    state: RelayState,
    pending: PendingFrames,
    browser: B,
    upstream: U,
    settings: RelaySettings,
}

enum ConnectPhase {
    Ready(EventStream),
    Finished(RelayOutcome),
}

// -----------------------------------------------------------------------------
// ----- Relay: Static ---------------------------------------------------------

impl<B, U> Relay<B, U>
where
    B: BrowserSocket,
    U: UpstreamSession,
{
    pub fn new(lease: ConnectionLease, browser: B, upstream: U, settings: RelaySettings) -> Self {
        Self {
            lease,
            state: RelayState::Accepted,
            pending: PendingFrames::new(),
            browser,
            upstream,
            settings,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Relay: Public ---------------------------------------------------------

impl<B, U> Relay<B, U>
where
    B: BrowserSocket,
    U: UpstreamSession,
{
    /// Drives the connection until either side closes, then tears down.
    pub async fn run(mut self) -> RelayOutcome {
        info!(
            conn = self.lease.id(),
            clients = self.lease.registry_active(),
            "new websocket connection established"
        );

        let outcome = match self.connect_phase().await {
            ConnectPhase::Ready(events) => self.ready_phase(events).await,
            ConnectPhase::Finished(outcome) => outcome,
        };

        self.teardown(outcome).await;
        outcome
    }
}

// -----------------------------------------------------------------------------
// ----- Relay: Connecting -----------------------------------------------------

impl<B, U> Relay<B, U>
where
    B: BrowserSocket,
    U: UpstreamSession,
{
    async fn connect_phase(&mut self) -> ConnectPhase {
        let conn = self.lease.id();

        let Some(events) = self.upstream.take_events() else {
            error!(conn, "upstream session has no event stream");
            return ConnectPhase::Finished(RelayOutcome::UpstreamUnavailable);
        };

        self.state = RelayState::Connecting;
        info!(conn, "connecting to upstream");

        let result = {
            let Relay {
                browser,
                upstream,
                pending,
                settings,
                state,
                ..
            } = self;

            let connect = bounded_connect(upstream, settings.connect_timeout);
            tokio::pin!(connect);

            loop {
                select! {
                    res = &mut connect => break res,

                    frame = browser.recv() => match frame {
                        Some(frame) => {
                            debug_assert!(state.buffers_frames());
                            pending.push(frame);
                            debug!(
                                conn,
                                queued = pending.count(),
                                bytes = pending.bytes(),
                                "queued client frame"
                            );
                        }
                        None => {
                            info!(conn, "browser closed while connecting");
                            return ConnectPhase::Finished(RelayOutcome::BrowserClosed);
                        }
                    },
                }
            }
        };

        let result = result.and_then(|()| {
            if self.upstream.is_connected() {
                Ok(())
            } else {
                Err(RelayError::UpstreamUnavailable(
                    "session closed during handshake".to_string(),
                ))
            }
        });

        if let Err(e) = result {
            error!(conn, "error connecting to upstream: {e}");
            let dropped = self.pending.discard();
            if dropped > 0 {
                warn!(conn, dropped, "discarding queued client frames");
            }
            return ConnectPhase::Finished(RelayOutcome::UpstreamUnavailable);
        }

        info!(conn, "connected to upstream");
        self.state = RelayState::Ready;

        while let Some(frame) = self.pending.pop() {
            if let Err(outcome) = self.forward_to_upstream(frame).await {
                return ConnectPhase::Finished(outcome);
            }
        }

        ConnectPhase::Ready(events)
    }
}

// -----------------------------------------------------------------------------
// ----- Relay: Ready ----------------------------------------------------------

impl<B, U> Relay<B, U>
where
    B: BrowserSocket,
    U: UpstreamSession,
{
    async fn ready_phase(&mut self, mut events: EventStream) -> RelayOutcome {
        let conn = self.lease.id();

        loop {
            select! {

                // -- Client frames --
                frame = self.browser.recv() => match frame {
                    Some(frame) => {
                        if let Err(outcome) = self.forward_to_upstream(frame).await {
                            return outcome;
                        }
                    }
                    None => return RelayOutcome::BrowserClosed,
                },

                // -- Upstream events --
                event = events.recv() => match event {
                    Some(UpstreamEvent::Event(event)) => {
                        debug!(conn, event_type = ?event.event_type, "relaying event to client");
                        if let Err(e) = self.browser.send_text(event.raw).await {
                            warn!(conn, "{e}");
                            return RelayOutcome::BrowserSendFailure;
                        }
                    }
                    Some(UpstreamEvent::Closed) | None => {
                        info!(conn, "upstream session closed");
                        return RelayOutcome::UpstreamClosed;
                    }
                },
            }
        }
    }

    /// Malformed frames are logged and dropped; only a failed send ends the relay.
    async fn forward_to_upstream(&mut self, frame: Bytes) -> Result<(), RelayOutcome> {
        let conn = self.lease.id();

        let event = match ClientEvent::parse(&frame) {
            Ok(event) => event,
            Err(e) => {
                warn!(conn, "error parsing event from client: {e}");
                return Ok(());
            }
        };

        let (event_type, fields) = event.into_parts();
        debug!(conn, event_type = %event_type, "relaying event to upstream");

        self.upstream
            .send(&event_type, fields)
            .await
            .map_err(|e| {
                error!(conn, "{e}");
                RelayOutcome::UpstreamSendFailure
            })
    }
}

// -----------------------------------------------------------------------------
// ----- Relay: Teardown -------------------------------------------------------

impl<B, U> Relay<B, U>
where
    B: BrowserSocket,
    U: UpstreamSession,
{
    async fn teardown(&mut self, outcome: RelayOutcome) {
        if self.state.is_terminal() {
            return;
        }
        self.state = RelayState::Closed;
        self.pending.discard();

        if !outcome.browser_gone() {
            self.browser.close().await;
        }
        self.upstream.disconnect().await;

        if self.lease.release() {
            info!(
                conn = self.lease.id(),
                trigger = ?outcome,
                clients = self.lease.registry_active(),
                "websocket connection closed"
            );
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

async fn bounded_connect<U: UpstreamSession>(
    upstream: &mut U,
    limit: Option<Duration>,
) -> Result<(), RelayError> {
    let Some(limit) = limit else {
        return upstream.connect().await;
    };

    timeout(limit, upstream.connect()).await.map_err(|_| {
        RelayError::UpstreamUnavailable(format!(
            "handshake timed out after {}",
            humantime::format_duration(limit)
        ))
    })?
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
