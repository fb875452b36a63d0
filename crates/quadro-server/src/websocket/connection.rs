//! Per-connection state for a connected WebSocket client.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use quadro_core::ConnectionId;
use quadro_session::ConnectionContext;
use tokio::sync::mpsc;
use tracing::warn;

use crate::functionality::types::ServerEvent;

/// A connected client: its id, authenticated context, and outbound queue.
pub struct ClientConnection {
    id: ConnectionId,
    context: ConnectionContext,
    /// Send channel to the connection's WebSocket write task.
    tx: mpsc::Sender<String>,
    connected_at: Instant,
    /// Whether the client has responded since the last heartbeat check.
    is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a connection around its outbound channel.
    pub fn new(id: ConnectionId, context: ConnectionContext, tx: mpsc::Sender<String>) -> Self {
        let now = Instant::now();
        Self {
            id,
            context,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Connection id minted at upgrade time.
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Authenticated state from the connect-time handshake.
    #[must_use]
    pub fn context(&self) -> &ConnectionContext {
        &self.context
    }

    /// Enqueue a text frame for the client.
    ///
    /// Returns `false` if the channel is full or closed, incrementing the
    /// dropped-message counter.
    pub fn send(&self, message: String) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize an event and enqueue it.
    pub fn send_event(&self, event: &ServerEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(json) => self.send(json),
            Err(e) => {
                warn!(conn_id = %self.id, event = %event.event, error = %e, "failed to serialize event");
                false
            }
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong or any frame received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Check and reset the alive flag for the heartbeat.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
