use axum::{
    Json, Router,
    extract::{
        Request, State,
        ws::{WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use tower::ServiceExt;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, warn};

use super::state::AppState;
use crate::config::Config;
use crate::errors::{RelayError, internal_server_error};
use crate::relay::Relay;

// -----------------------------------------------------------------------------
// ----- Types -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub status: String,
    pub connected_clients: usize,
    pub port: u16,
}

#[derive(Clone)]
struct RouterState {
    app: AppState,

    // Stand-in for the page renderer; `None` answers 404.
    pages: Option<ServeDir>,
}

// -----------------------------------------------------------------------------
// ----- Router ----------------------------------------------------------------

/// One router for every traffic class: status JSON, WebSocket upgrades on any
/// path, and everything else handed to the page collaborator.
pub fn router(config: &Config, app: AppState) -> Router {
    let state = RouterState {
        app,
        pages: config.static_dir.as_ref().map(ServeDir::new),
    };

    Router::new()
        .route(&config.status_path, any(status_or_upgrade))
        .fallback(page_or_upgrade)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// -----------------------------------------------------------------------------
// ----- Handlers --------------------------------------------------------------

async fn status_or_upgrade(
    State(state): State<RouterState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if let Ok(upgrade) = upgrade {
        return accept_relay(state.app, upgrade);
    }

    Json(StatusBody {
        status: "available".to_string(),
        connected_clients: state.app.registry.active(),
        port: state.app.port,
    })
    .into_response()
}

async fn page_or_upgrade(
    State(state): State<RouterState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    request: Request,
) -> Result<Response, RelayError> {
    if let Ok(upgrade) = upgrade {
        return Ok(accept_relay(state.app, upgrade));
    }

    let Some(pages) = state.pages else {
        return Ok((StatusCode::NOT_FOUND, "not found").into_response());
    };

    let response = pages
        .oneshot(request)
        .await
        .map_err(|e| RelayError::RequestHandlingFailure(e.to_string()))?;

    if response.status().is_server_error() {
        return Err(RelayError::RequestHandlingFailure(format!(
            "page renderer answered {}",
            response.status()
        )));
    }

    Ok(response.into_response())
}

fn accept_relay(app: AppState, upgrade: WebSocketUpgrade) -> Response {
    upgrade
        .on_failed_upgrade(|e| warn!("websocket upgrade failed: {e}"))
        .on_upgrade(move |socket| async move {
            let lease = app.registry.open();
            let upstream = app.connector.session();

            Relay::new(lease, socket, upstream, app.relay.clone())
                .run()
                .await;
        })
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    error!("error occurred handling request: {detail}");
    internal_server_error()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
