//! `RealtimeServer` — Axum HTTP + WebSocket gateway.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use quadro_projects::ProjectDirectory;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::functionality::context::EventContext;
use crate::functionality::registry::EventRegistry;
use crate::health::{self, HealthResponse};
use crate::metrics;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::rooms::RoomRegistry;
use crate::websocket::session::run_ws_session;
use quadro_session::{HandshakeAuth, authenticate};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Gateway settings.
    pub config: Arc<ServerConfig>,
    /// Event registry, populated at startup.
    pub registry: Arc<EventRegistry>,
    /// Service handles shared with every handler.
    pub ctx: EventContext,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Handle for rendering `/metrics`.
    pub metrics_handle: PrometheusHandle,
}

/// Credentials presented on the upgrade request's query string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandshakeQuery {
    socket_token: Option<String>,
    session_token: Option<String>,
}

/// The realtime gateway server.
pub struct RealtimeServer {
    config: Arc<ServerConfig>,
    registry: Arc<EventRegistry>,
    ctx: EventContext,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics_handle: PrometheusHandle,
}

impl RealtimeServer {
    /// Create a new server around a populated registry and the project
    /// directory.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        registry: EventRegistry,
        directory: Arc<ProjectDirectory>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        let ctx = EventContext::new(directory, Arc::new(RoomRegistry::new()));
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            ctx,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics_handle,
        }
    }

    /// Build the Axum router with all routes.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = AppState {
            config: self.config.clone(),
            registry: self.registry.clone(),
            ctx: self.ctx.clone(),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
            metrics_handle: self.metrics_handle.clone(),
        };
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind and serve. Returns the bound address and the serve task handle.
    ///
    /// The task drains existing connections when the shutdown coordinator
    /// fires.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), std::io::Error> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "quadro realtime server listening");

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                warn!(error = %e, "server exited with error");
            }
        });
        Ok((local_addr, handle))
    }

    /// Get the event context shared with handlers.
    #[must_use]
    pub fn ctx(&self) -> &EventContext {
        &self.ctx
    }

    /// Get the shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the event registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<EventRegistry> {
        &self.registry
    }
}

/// GET /ws — authenticate, then upgrade.
///
/// Both handshake tokens must validate before the upgrade is accepted; a
/// failed handshake is answered with 401 and the client-facing message as
/// the body, and no connection state is created.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<HandshakeQuery>,
    State(state): State<AppState>,
) -> Response {
    if state.ctx.rooms.connection_count().await >= state.config.max_connections {
        warn!("connection limit reached, refusing upgrade");
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }

    let auth = HandshakeAuth {
        socket_token: query.socket_token,
        session_token: query.session_token,
    };
    let context = match authenticate(&auth, &state.config.decoder_fields, &state.ctx.tokens) {
        Ok(context) => context,
        Err(err) => {
            warn!(error = %err, "handshake refused");
            return (StatusCode::UNAUTHORIZED, err.client_message().to_owned()).into_response();
        }
    };

    let heartbeat_interval = Duration::from_secs(state.config.heartbeat_interval_secs);
    let heartbeat_timeout = Duration::from_secs(state.config.heartbeat_timeout_secs);
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            run_ws_session(
                socket,
                context,
                state.registry,
                state.ctx,
                heartbeat_interval,
                heartbeat_timeout,
            )
        })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.ctx.rooms.connection_count().await;
    let projects = state.ctx.directory.project_count();
    Json(health::health_check(state.start_time, connections, projects))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    metrics::render(&state.metrics_handle)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
