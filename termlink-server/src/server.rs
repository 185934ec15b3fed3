//! WebSocket host
//!
//! Serves the terminal socket over axum. Each upgraded socket gets its own
//! [`Connection`] driven by a single `select!` loop; a writer task
//! serialises outbound messages from a bounded queue.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use termlink_protocol::ServerMessage;
use termlink_utils::Result;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::connection::Connection;
use crate::pty::PtyBackend;

/// Outbound messages that may queue up before the connection waits on the socket
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

/// Shared state for socket handlers
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: Arc<dyn PtyBackend>,
    /// Cancelled when the server is shutting down
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig, backend: Arc<dyn PtyBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build the router serving the terminal socket
pub fn router(state: Arc<AppState>) -> Router {
    let path = state.config.server.ws_path.clone();
    Router::new()
        .route(&path, get(ws_handler))
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn run(config: AppConfig, backend: Arc<dyn PtyBackend>) -> Result<()> {
    let listener = TcpListener::bind(&config.server.bind_addr).await?;
    let state = Arc::new(AppState::new(config, backend));
    serve(listener, state, wait_for_signal()).await
}

/// Serve on an already bound listener until `signal` completes.
///
/// Open sockets are told to close through the state's shutdown token.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    signal: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    info!(
        addr = %listener.local_addr()?,
        path = %state.config.server.ws_path,
        max_sessions = state.config.terminal.max_sessions,
        "termlink server listening"
    );

    let shutdown = state.shutdown.clone();
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        signal.await;
        shutdown.cancel();
    })
    .await?;

    info!("termlink server stopped");
    Ok(())
}

async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    if !peer.ip().is_loopback() {
        warn!(%peer, "Rejecting non-loopback peer");
        return StatusCode::FORBIDDEN.into_response();
    }

    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    if !origin_allowed(origin, &state.config.server.allowed_origins) {
        warn!(%peer, origin = ?origin, "Rejecting cross-origin upgrade");
        return StatusCode::FORBIDDEN.into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, peer, state))
}

/// Whether a browser `Origin` may open a terminal socket.
///
/// Requests without an origin come from non-browser clients and pass.
pub fn origin_allowed(origin: Option<&str>, allowed: &[String]) -> bool {
    let Some(origin) = origin else {
        return true;
    };

    let origin = origin.trim_end_matches('/');
    if allowed
        .iter()
        .any(|a| a.trim_end_matches('/').eq_ignore_ascii_case(origin))
    {
        return true;
    }

    matches!(
        origin_host(origin).map(|h| h.to_ascii_lowercase()).as_deref(),
        Some("localhost" | "127.0.0.1" | "[::1]")
    )
}

/// Host part of an origin such as `http://localhost:3000`
fn origin_host(origin: &str) -> Option<&str> {
    let (scheme, rest) = origin.split_once("://")?;
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return None;
    }

    let authority = rest.split('/').next().unwrap_or(rest);
    if authority.starts_with('[') {
        let end = authority.find(']')?;
        Some(&authority[..=end])
    } else {
        Some(authority.split(':').next().unwrap_or(authority))
    }
}

async fn handle_socket(socket: WebSocket, peer: SocketAddr, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CHANNEL_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let text = match msg.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!(%connection_id, error = %e, "Failed to encode message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let mut conn = Connection::new(
        connection_id,
        Arc::clone(&state.backend),
        Arc::clone(&state.config),
        out_tx,
    );
    info!(%connection_id, %peer, "Terminal connection opened");

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => conn.handle_text(text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%connection_id, error = %e, "WebSocket read error");
                    break;
                }
            },
            Some(event) = conn.next_event() => conn.handle_event(event).await,
        }
    }

    // Dropping the connection closes the outbound channel and ends the writer
    conn.close();
    drop(conn);
    let _ = writer.await;
}
