//! HTTP and WebSocket wiring around the matchmaking broker.

use crate::config::RelayConfig;
use crate::matchmaking::Broker;
use crate::wire_format::ServerMessage;
use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderValue, StatusCode, header::InvalidHeaderValue},
    response::IntoResponse,
    routing::{get, post},
};
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
    time,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

pub type SharedBroker = Arc<Mutex<Broker>>;

#[derive(Clone)]
pub struct AppState {
    pub broker: SharedBroker,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            broker: Arc::new(Mutex::new(Broker::new(&config))),
            config: Arc::new(config),
        }
    }
}

/// A panicking connection task must not take the whole broker down, so a
/// poisoned lock is taken over as-is.
pub fn lock_broker(broker: &SharedBroker) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn router(state: AppState) -> Result<Router, InvalidHeaderValue> {
    let origin = state.config.client_url.parse::<HeaderValue>()?;
    Ok(Router::new()
        .route("/", get(|| async { "Bulletcore Matchmaking Server" }))
        .route("/ws", get(websocket_handler))
        .route("/status", get(status))
        .route("/lobbies", post(create_lobby))
        .layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state))
}

/// Periodically drops idle matches.
pub fn spawn_sweeper(state: &AppState) -> JoinHandle<()> {
    let broker = state.broker.clone();
    let period = state.config.sweep_interval;
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        loop {
            interval.tick().await;
            let removed = lock_broker(&broker).sweep_expired(Instant::now());
            if removed > 0 {
                info!("Swept {} expired matches", removed);
            }
        }
    })
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(lock_broker(&state.broker).status())
}

async fn create_lobby(State(state): State<AppState>) -> impl IntoResponse {
    let code = lock_broker(&state.broker).create_lobby();
    (StatusCode::CREATED, code.as_str().to_string())
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = broadcast::channel::<ServerMessage>(100);
    let connection = lock_broker(&state.broker).connect(tx);

    info!("New WebSocket connection: {}", connection);

    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    let json = match msg.to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Failed to encode {:?}: {}", msg, e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Connection {} lagged, dropped {} messages", connection, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let recv_task = {
        let broker = state.broker.clone();
        tokio::spawn(async move {
            while let Some(msg) = receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        lock_broker(&broker).handle_text(connection, text.as_str(), Instant::now());
                    }
                    Ok(Message::Close(_)) => break,
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            lock_broker(&broker).disconnect(connection);
        })
    };

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("WebSocket connection closed: {}", connection);
}
