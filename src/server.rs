//! WebSocket server streaming BVP chunks into per-connection sessions.
//!
//! This module provides a server that:
//! - Accepts websocket connections on `/`, one [`StreamingSession`] each
//! - Feeds data frames through the session's effort queue
//! - Records every session under the configured save path
//!
//! # Architecture
//!
//! ```text
//! client ──ws──→ StreamingSession ──→ EffortQueue ──→ EffortCalculator
//!                       │
//!                       └──→ SessionRecorder (samples + effort files)
//! ```

use crate::config::{Config, ConfigError};
use crate::core::{EffortCalculator, EffortQueue, ModeRegistry, WarmupRamp};
use crate::protocol::Reply;
use crate::recording::SessionRecorder;
use crate::session::StreamingSession;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (port 0 for random)
    pub bind_address: SocketAddr,
    /// Samples per session window
    pub capacity: usize,
    /// Calculator assigned to new sessions
    pub default_mode: EffortCalculator,
    /// Warm-up behaviour of new session queues
    pub warmup: WarmupRamp,
    /// Root directory for session recordings
    pub save_path: PathBuf,
}

impl ServerConfig {
    /// Build a server configuration from the user configuration.
    pub fn from_config(config: &Config, registry: &ModeRegistry) -> Result<Self, ConfigError> {
        let default_mode = config.validate(registry)?;
        Ok(Self {
            bind_address: config.bind_address,
            capacity: config.window_capacity()?,
            default_mode,
            warmup: config.warmup,
            save_path: config.save_path.clone(),
        })
    }
}

/// Shared, read-only server state. Each connection builds its own queue
/// from it.
pub struct ServerState {
    config: ServerConfig,
    registry: Arc<ModeRegistry>,
}

impl ServerState {
    pub fn new(config: ServerConfig, registry: ModeRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
        }
    }

    fn new_queue(&self) -> EffortQueue {
        EffortQueue::with_warmup(
            self.config.capacity,
            self.config.default_mode,
            self.config.warmup,
        )
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Handle to a running server.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the server is actually listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for the server task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            tracing::error!("Server task failed: {}", e);
        }
    }
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /modes
async fn modes(State(state): State<Arc<ServerState>>) -> Json<Reply> {
    Json(Reply::Modes {
        modes: state.registry.names(),
    })
}

/// GET / (websocket upgrade)
async fn stream(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one connection until the peer disconnects or recording fails.
async fn handle_socket(mut socket: WebSocket, state: Arc<ServerState>) {
    let recorder = match SessionRecorder::create_unique(&state.config.save_path, Utc::now()) {
        Ok(recorder) => recorder,
        Err(e) => {
            tracing::error!("Failed to create session recording: {}", e);
            return;
        }
    };

    let mut session = StreamingSession::new(
        recorder.session_id().to_string(),
        state.new_queue(),
        Arc::clone(&state.registry),
        recorder,
    );

    while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    tracing::warn!(session = %session.id(), "dropping non-UTF-8 binary frame");
                    continue;
                }
            },
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::warn!(session = %session.id(), "Connection error: {}", e);
                break;
            }
        };

        match session.handle_frame(&text) {
            Ok(Some(reply)) => {
                let payload = match serde_json::to_string(&reply) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!(session = %session.id(), "Failed to encode reply: {}", e);
                        continue;
                    }
                };
                if let Err(e) = socket.send(Message::Text(payload)).await {
                    tracing::warn!(session = %session.id(), "Failed to send reply: {}", e);
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(session = %session.id(), "Ending session: {}", e);
                break;
            }
        }
    }

    if let Err(e) = session.close() {
        tracing::error!(session = %session.id(), "Failed to close session: {}", e);
    }
}

/// Build the router.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(stream))
        .route("/health", get(health))
        .route("/modes", get(modes))
        .with_state(state)
}

/// Run the websocket server
pub async fn run(config: ServerConfig, registry: ModeRegistry) -> anyhow::Result<ServerHandle> {
    if registry.is_empty() {
        anyhow::bail!("no effort modes registered");
    }
    let bind_address = config.bind_address;
    let mode_count = registry.len();
    let state = Arc::new(ServerState::new(config, registry));
    let app = router(state);

    let listener = TcpListener::bind(bind_address).await?;
    let addr = listener.local_addr()?;

    tracing::info!("Effort server listening on ws://{} ({} modes)", addr, mode_count);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(ServerHandle {
        addr,
        shutdown_tx,
        task,
    })
}
