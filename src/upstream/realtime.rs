use async_trait::async_trait;
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use rand::{Rng, distr::Alphanumeric};
use serde_json::{Map, Value};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::{net::TcpStream, sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        handshake::client::Request,
        http::{HeaderValue, header::AUTHORIZATION},
    },
};
use tracing::{debug, trace};

use super::{ConnectState, EventStream, ServerEvent, UpstreamConnector, UpstreamEvent, UpstreamSession};
use crate::config::UpstreamConfig;
use crate::errors::RelayError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const BETA_HEADER: &str = "openai-beta";
const BETA_HEADER_VALUE: &str = "realtime=v1";
const EVENT_ID_PREFIX: &str = "evt_";
const EVENT_ID_LEN: usize = 21;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// -----------------------------------------------------------------------------
// ----- RealtimeConnector -----------------------------------------------------

#[derive(Debug, Clone)]
pub struct RealtimeConnector {
    config: UpstreamConfig,
}

impl RealtimeConnector {
    pub fn new(config: UpstreamConfig) -> Self {
        Self { config }
    }
}

impl UpstreamConnector for RealtimeConnector {
    fn session(&self) -> Box<dyn UpstreamSession> {
        Box::new(RealtimeSession::new(self.config.clone()))
    }
}

// -----------------------------------------------------------------------------
// ----- RealtimeSession -------------------------------------------------------

/// A WebSocket session with the realtime service.
///
/// Writes go through a dedicated writer task; reads are pumped by a reader
/// task into the event stream, which ends with a single `Closed`.
#[derive(Debug)]
pub struct RealtimeSession {
    config: UpstreamConfig,
    state: ConnectState,
    attempted: bool,

    // Flipped by the reader task when the socket goes away.
    alive: Arc<AtomicBool>,

    outbound: Option<mpsc::UnboundedSender<Message>>,
    events_tx: Option<mpsc::UnboundedSender<UpstreamEvent>>,
    events_rx: Option<EventStream>,
    reader: Option<JoinHandle<()>>,
}

// -----------------------------------------------------------------------------
// ----- RealtimeSession: Static -----------------------------------------------

impl RealtimeSession {
    pub fn new(config: UpstreamConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            config,
            state: ConnectState::Disconnected,
            attempted: false,
            alive: Arc::new(AtomicBool::new(false)),
            outbound: None,
            events_tx: Some(events_tx),
            events_rx: Some(events_rx),
            reader: None,
        }
    }

    pub fn state(&self) -> ConnectState {
        self.state
    }
}

// -----------------------------------------------------------------------------
// ----- RealtimeSession: UpstreamSession --------------------------------------

#[async_trait]
impl UpstreamSession for RealtimeSession {
    async fn connect(&mut self) -> Result<(), RelayError> {
        if self.attempted {
            return Err(RelayError::UpstreamUnavailable(
                "connect already attempted for this session".to_string(),
            ));
        }
        self.attempted = true;
        self.state = ConnectState::Connecting;

        let request = match build_request(&self.config) {
            Ok(request) => request,
            Err(e) => {
                self.state = ConnectState::Disconnected;
                return Err(e);
            }
        };

        let stream = match connect_async(request).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                self.state = ConnectState::Disconnected;
                return Err(RelayError::UpstreamUnavailable(e.to_string()));
            }
        };

        let Some(events_tx) = self.events_tx.take() else {
            self.state = ConnectState::Disconnected;
            return Err(RelayError::UpstreamUnavailable(
                "event channel missing".to_string(),
            ));
        };

        let (sink, stream) = stream.split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Message>();

        self.alive.store(true, Ordering::Release);
        spawn_writer_task(sink, outbound_rx);
        self.reader = Some(spawn_reader_task(stream, events_tx, self.alive.clone()));
        self.outbound = Some(outbound_tx);
        self.state = ConnectState::Connected;

        Ok(())
    }

    async fn send(
        &mut self,
        event_type: &str,
        mut event: Map<String, Value>,
    ) -> Result<(), RelayError> {
        if !self.is_connected() {
            return Err(RelayError::UpstreamSendFailure(
                "session is not connected".to_string(),
            ));
        }

        let Some(outbound) = self.outbound.as_ref() else {
            return Err(RelayError::UpstreamSendFailure(
                "session writer missing".to_string(),
            ));
        };

        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event
            .entry("event_id")
            .or_insert_with(|| Value::String(generate_event_id()));

        let text = serde_json::to_string(&event)
            .map_err(|e| RelayError::UpstreamSendFailure(e.to_string()))?;

        trace!("upstream <- {text}");

        outbound
            .send(Message::Text(text.into()))
            .map_err(|_| RelayError::UpstreamSendFailure("session writer closed".to_string()))
    }

    fn is_connected(&self) -> bool {
        self.state == ConnectState::Connected && self.alive.load(Ordering::Acquire)
    }

    fn take_events(&mut self) -> Option<EventStream> {
        self.events_rx.take()
    }

    async fn disconnect(&mut self) {
        if self.state == ConnectState::Disconnected && self.outbound.is_none() {
            return;
        }

        // Dropping the sender lets the writer flush and send a close frame.
        self.outbound = None;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }

        self.alive.store(false, Ordering::Release);
        self.state = ConnectState::Disconnected;
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn build_request(config: &UpstreamConfig) -> Result<Request, RelayError> {
    let mut request = config
        .endpoint()
        .into_client_request()
        .map_err(|e| RelayError::UpstreamUnavailable(format!("bad upstream url: {e}")))?;

    let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key_exposed()))
        .map_err(|_| RelayError::UpstreamUnavailable("credential is not a valid header".to_string()))?;

    let headers = request.headers_mut();
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(BETA_HEADER, HeaderValue::from_static(BETA_HEADER_VALUE));

    Ok(request)
}

fn generate_event_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(EVENT_ID_LEN)
        .map(char::from)
        .collect();

    format!("{EVENT_ID_PREFIX}{suffix}")
}

fn spawn_writer_task(
    mut sink: SplitSink<WsStream, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    tokio::spawn(async move {
        'outer: while let Some(msg) = rx.recv().await {
            if sink.feed(msg).await.is_err() {
                break;
            }

            // coalesce bursts into a single flush
            while let Ok(more) = rx.try_recv() {
                if sink.feed(more).await.is_err() {
                    break 'outer;
                }
            }

            if sink.flush().await.is_err() {
                break;
            }
        }

        let _ = sink.close().await;
    });
}

fn spawn_reader_task(
    mut stream: SplitStream<WsStream>,
    events: mpsc::UnboundedSender<UpstreamEvent>,
    alive: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(frame)) => {
                    debug!("upstream sent close: {frame:?}");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    debug!("upstream read error: {e}");
                    break;
                }
            };

            let raw = text.as_str().to_string();
            let event_type = match serde_json::from_str::<Value>(&raw) {
                Ok(value) => value.get("type").and_then(Value::as_str).map(str::to_string),
                Err(e) => {
                    debug!("upstream sent text that is not JSON ({e}): {raw}");
                    continue;
                }
            };

            if events
                .send(UpstreamEvent::Event(ServerEvent { event_type, raw }))
                .is_err()
            {
                break;
            }
        }

        alive.store(false, Ordering::Release);
        let _ = events.send(UpstreamEvent::Closed);
    })
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
