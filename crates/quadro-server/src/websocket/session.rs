//! WebSocket session lifecycle — handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use quadro_core::ConnectionId;
use quadro_session::ConnectionContext;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::handler::handle_event;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::functionality::context::EventContext;
use crate::functionality::registry::EventRegistry;
use crate::functionality::types::ServerEvent;
use crate::metrics::{
    SUBSCRIPTIONS_ACTIVE, WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE,
    WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL,
};

/// Outbound queue depth per connection.
const SEND_QUEUE_CAPACITY: usize = 1024;

/// Run a WebSocket session for an authenticated client.
///
/// 1. Registers the connection and sends a `connected` signal with its id
/// 2. Forwards queued outbound frames and periodic Ping frames
/// 3. Monitors liveness; an unresponsive client is disconnected
/// 4. Dispatches incoming frames through the event registry
/// 5. On exit leaves all rooms, deregisters, and sweeps the departing
///    socket token out of every subscription
#[instrument(skip_all, fields(conn_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    context: ConnectionContext,
    registry: Arc<EventRegistry>,
    ctx: EventContext,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
) {
    let connection_id = ConnectionId::new();
    let _ = tracing::Span::current().record("conn_id", connection_id.as_str());
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<String>(SEND_QUEUE_CAPACITY);
    let connection = Arc::new(ClientConnection::new(
        connection_id.clone(),
        context,
        send_tx,
    ));

    let connection_start = Instant::now();
    info!(user_id = ?connection.context().user_id(), "client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    ctx.rooms.add(connection.clone()).await;

    // The connected signal goes straight out, ahead of anything queued.
    let connected = ServerEvent::with_data(
        "connected",
        json!({ "connectionId": connection_id.as_str() }),
    );
    if let Ok(frame) = serde_json::to_string(&connected) {
        let _ = ws_tx.send(Message::Text(frame.into())).await;
    }

    let cancel = CancellationToken::new();

    // Outbound forwarder with periodic Ping frames.
    let outbound_cancel = cancel.clone();
    let outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat_interval);
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
                () = outbound_cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Liveness monitor; a timeout tears the whole session down.
    let hb_connection = connection.clone();
    let hb_cancel = cancel.clone();
    let heartbeat = tokio::spawn(async move {
        let result = run_heartbeat(
            hb_connection,
            heartbeat_interval,
            heartbeat_timeout,
            hb_cancel.child_token(),
        )
        .await;
        if result == HeartbeatResult::TimedOut {
            warn!("client unresponsive, disconnecting");
            hb_cancel.cancel();
        }
    });

    // Inbound loop.
    loop {
        let msg = tokio::select! {
            msg = ws_rx.next() => msg,
            () = cancel.cancelled() => break,
        };
        let Some(Ok(msg)) = msg else { break };

        // Text and Binary both carry event frames (some clients send binary).
        let text = match msg {
            Message::Text(ref t) => {
                connection.mark_alive();
                Some(t.to_string())
            }
            Message::Binary(ref data) => {
                connection.mark_alive();
                match std::str::from_utf8(data) {
                    Ok(s) => Some(s.to_string()),
                    Err(_) => {
                        debug!(len = data.len(), "received non-UTF8 binary frame");
                        None
                    }
                }
            }
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                connection.mark_alive();
                None
            }
        };

        let Some(text) = text else { continue };
        handle_event(&text, &connection, &registry, &ctx).await;
    }

    // Clean up.
    cancel.cancel();
    outbound.abort();
    heartbeat.abort();

    ctx.rooms.leave_all(&connection_id).await;
    ctx.rooms.remove(&connection_id).await;
    let swept = ctx
        .directory
        .mark_disconnected(connection.context().socket_token());
    if !swept.is_empty() {
        #[allow(clippy::cast_precision_loss)]
        gauge!(SUBSCRIPTIONS_ACTIVE).decrement(swept.len() as f64);
    }

    info!(
        dropped = connection.drop_count(),
        swept_projects = swept.len(),
        "client disconnected"
    );
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection_start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    // Full session behavior requires real WebSocket connections and is
    // covered by tests/integration.rs. The wire shape of the connected
    // signal is pinned here.

    use crate::functionality::types::ServerEvent;
    use serde_json::json;

    #[test]
    fn connected_signal_carries_the_connection_id() {
        let ev = ServerEvent::with_data("connected", json!({ "connectionId": "c1" }));
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["event"], "connected");
        assert_eq!(v["data"]["connectionId"], "c1");
    }
}
