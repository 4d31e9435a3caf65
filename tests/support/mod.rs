use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http_body_util::{BodyExt, Empty};
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use secrecy::SecretString;
use serde_json::Value;
use std::{
    net::SocketAddr,
    process::{Command, Output},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{mpsc, oneshot},
    time::{sleep, timeout},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, accept_hdr_async, connect_async,
    tungstenite::{
        Message,
        handshake::server::{ErrorResponse, Request, Response},
        http::StatusCode,
    },
};

use relaycrab::{
    AppState, Config, ConnectionRegistry, config::LogLevel, config::UpstreamConfig, gateway,
    gateway::StatusBody, router,
};

pub const GOOD_KEY: &str = "sk-test-good";

pub const REPLY: &str = r#"{"type":"response.created","event_id":"evt_up_1","response":{"id":"resp_1","status":"in_progress"}}"#;

pub const TYPELESS: &str = r#"{"no_type":1,"payload":"kept"}"#;

pub type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// -----------------------------------------------------------------------------
// ----- Fake upstream ---------------------------------------------------------

pub struct FakeUpstream {
    pub url: String,
    pub received: mpsc::UnboundedReceiver<Value>,
    #[allow(dead_code)]
    pub handshakes: Arc<AtomicUsize>,
}

/// A stand-in realtime service. Rejects handshakes without `GOOD_KEY`, answers
/// `input_text` with `REPLY` and `test.typeless` with `TYPELESS`, and hangs up
/// on `test.close`.
pub async fn spawn_fake_upstream() -> FakeUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/v1/realtime", listener.local_addr().unwrap());
    let (tx, received) = mpsc::unbounded_channel();
    let handshakes = Arc::new(AtomicUsize::new(0));

    let counter = handshakes.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let tx = tx.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                let callback = |req: &Request, resp: Response| {
                    let auth = req
                        .headers()
                        .get("authorization")
                        .and_then(|v| v.to_str().ok());
                    let expected = format!("Bearer {GOOD_KEY}");
                    if auth == Some(expected.as_str()) {
                        Ok(resp)
                    } else {
                        let mut err = ErrorResponse::new(Some("invalid api key".to_string()));
                        *err.status_mut() = StatusCode::UNAUTHORIZED;
                        Err(err)
                    }
                };

                let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                while let Some(Ok(msg)) = ws.next().await {
                    let Message::Text(text) = msg else {
                        continue;
                    };
                    let Ok(event) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    let event_type = event["type"].as_str().unwrap_or_default().to_string();
                    let _ = tx.send(event);

                    match event_type.as_str() {
                        "input_text" => {
                            let _ = ws.send(Message::Text(REPLY.into())).await;
                        }
                        "test.typeless" => {
                            let _ = ws.send(Message::Text(TYPELESS.into())).await;
                        }
                        "test.close" => {
                            let _ = ws.close(None).await;
                            break;
                        }
                        _ => {}
                    }
                }
            });
        }
    });

    FakeUpstream {
        url,
        received,
        handshakes,
    }
}

// -----------------------------------------------------------------------------
// ----- Relay binary ----------------------------------------------------------

/// Runs the real binary to completion without an upstream credential in its
/// environment.
#[allow(dead_code)]
pub fn run_relaycrab_without_key() -> Output {
    let exe = env!("CARGO_BIN_EXE_relaycrab");

    Command::new(exe)
        .env_remove("OPENAI_API_KEY")
        .env("WEBSITE_HOSTNAME", "127.0.0.1")
        .env("PORT", "0")
        .output()
        .expect("run relaycrab")
}

// -----------------------------------------------------------------------------
// ----- Relay server ----------------------------------------------------------

pub struct RelayServer {
    pub addr: SocketAddr,
    #[allow(dead_code)]
    pub registry: Arc<ConnectionRegistry>,
    _shutdown: oneshot::Sender<()>,
}

pub async fn spawn_relay(upstream_url: &str, api_key: &str) -> RelayServer {
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        log_level: LogLevel::Debug,
        status_path: "/api/ws".to_string(),
        static_dir: None,
        upstream: UpstreamConfig {
            url: upstream_url.to_string(),
            model: "test-model".to_string(),
            api_key: SecretString::new(api_key.to_string().into_boxed_str()),
            connect_timeout: Some(Duration::from_secs(5)),
        },
    };

    let listener = gateway::bind(&config.host, config.port).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let state = AppState::from_config(&config, addr.port());
    let registry = state.registry.clone();
    let app = router(&config, state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(gateway::run_until(listener, app, async move {
        let _ = shutdown_rx.await;
    }));

    RelayServer {
        addr,
        registry,
        _shutdown: shutdown_tx,
    }
}

// -----------------------------------------------------------------------------
// ----- Browser side ----------------------------------------------------------

pub async fn connect_browser(addr: SocketAddr, path: &str) -> ClientSocket {
    let (ws, _) = connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("websocket upgrade should succeed");
    ws
}

/// Next message from the relay, `None` once the socket has ended.
pub async fn next_message(ws: &mut ClientSocket) -> Option<Message> {
    match timeout(Duration::from_secs(5), ws.next()).await {
        Ok(Some(Ok(msg))) => Some(msg),
        Ok(_) => None,
        Err(_) => panic!("timed out waiting for relay"),
    }
}

pub async fn get_status(addr: SocketAddr) -> StatusBody {
    let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();
    let uri = format!("http://{addr}/api/ws").parse().unwrap();

    let response = client.get(uri).await.expect("status request");
    assert!(response.status().is_success());

    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).expect("status body is json")
}

#[allow(dead_code)]
pub async fn wait_for_clients(addr: SocketAddr, expected: usize) {
    for _ in 0..100 {
        if get_status(addr).await.connected_clients == expected {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("relay never reported {expected} connected clients");
}

#[allow(dead_code)]
pub async fn next_upstream_event(upstream: &mut FakeUpstream) -> Value {
    timeout(Duration::from_secs(5), upstream.received.recv())
        .await
        .expect("timed out waiting for upstream")
        .expect("upstream channel closed")
}
