use axum::Router;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use std::{future::Future, io, net::SocketAddr};
use tokio::net::{TcpListener, TcpSocket, TcpStream, lookup_host};
use tracing::{debug, error, info};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const LISTEN_BACKLOG: u32 = 1024;

// -----------------------------------------------------------------------------
// ----- Listener --------------------------------------------------------------

/// Resolves `host` and binds the first address it yields.
pub async fn bind(host: &str, port: u16) -> io::Result<TcpListener> {
    let addr: SocketAddr = lookup_host((host, port)).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{host} did not resolve to any address"),
        )
    })?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };

    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;

    socket.listen(LISTEN_BACKLOG)
}

// -----------------------------------------------------------------------------
// ----- Accept loop -----------------------------------------------------------

/// Accepts sockets one at a time and serves each on its own task until
/// `shutdown` resolves. A failing socket never takes the loop down.
pub async fn run_until<F>(listener: TcpListener, app: Router, shutdown: F) -> io::Result<()>
where
    F: Future,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }

            accept_res = listener.accept() => {
                let (stream, peer) = match accept_res {
                    Ok(v) => v,
                    Err(e) => { error!("accept error: {e}"); continue; }
                };

                let _ = stream.set_nodelay(true);
                let app = app.clone();

                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, app).await {
                        debug!("client {peer} error: {e}");
                    }
                });
            }
        }
    }

    Ok(())
}

/// Serves HTTP/1 and HTTP/2 on one socket, keeping upgrades available for
/// WebSocket handshakes.
pub async fn serve_connection(
    stream: TcpStream,
    app: Router,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let io = TokioIo::new(stream);
    let service = TowerToHyperService::new(app);

    auto::Builder::new(TokioExecutor::new())
        .serve_connection_with_upgrades(io, service)
        .await
}
