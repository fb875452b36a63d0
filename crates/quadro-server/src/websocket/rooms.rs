//! Project broadcast rooms and connection fan-out.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use metrics::counter;
use quadro_core::{ConnectionId, ProjectId};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::connection::ClientConnection;
use crate::functionality::types::ServerEvent;
use crate::metrics::ROOM_BROADCAST_DROPS_TOTAL;

/// All live connections plus the project rooms they have joined.
///
/// Joining a room is what makes a connection reachable by project-wide
/// broadcasts; the subscription protocol is the only caller of `join`.
pub struct RoomRegistry {
    /// Live connections indexed by connection id.
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
    /// Room membership per project.
    rooms: RwLock<HashMap<ProjectId, HashSet<ConnectionId>>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Register a live connection.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id().clone(), connection);
    }

    /// Deregister a connection. Rooms are not touched; callers run
    /// [`RoomRegistry::leave_all`] first.
    pub async fn remove(&self, connection_id: &ConnectionId) {
        let mut conns = self.connections.write().await;
        let _ = conns.remove(connection_id);
    }

    /// Join a connection to a project's room. Set semantics; re-joining is a
    /// no-op.
    pub async fn join(&self, project_id: ProjectId, connection_id: &ConnectionId) {
        let mut rooms = self.rooms.write().await;
        let _ = rooms
            .entry(project_id)
            .or_default()
            .insert(connection_id.clone());
    }

    /// Remove a connection from a project's room.
    pub async fn leave(&self, project_id: ProjectId, connection_id: &ConnectionId) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(&project_id) {
            let _ = members.remove(connection_id);
            if members.is_empty() {
                let _ = rooms.remove(&project_id);
            }
        }
    }

    /// Remove a connection from every room it joined.
    pub async fn leave_all(&self, connection_id: &ConnectionId) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, members| {
            let _ = members.remove(connection_id);
            !members.is_empty()
        });
    }

    /// Broadcast an event to every connection in a project's room.
    ///
    /// The event is serialized once; connections whose outbound queue is
    /// saturated are skipped with a warning and counted as drops.
    pub async fn broadcast_to_project(&self, project_id: ProjectId, event: &ServerEvent) {
        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                warn!(event = %event.event, error = %e, "failed to serialize broadcast event");
                return;
            }
        };
        let Some(members) = self.rooms.read().await.get(&project_id).cloned() else {
            debug!(%project_id, event = %event.event, "broadcast to empty room");
            return;
        };
        let conns = self.connections.read().await;
        debug!(
            %project_id,
            event = %event.event,
            recipients = members.len(),
            "broadcast event to project room"
        );
        for id in &members {
            if let Some(conn) = conns.get(id) {
                if !conn.send(json.clone()) {
                    counter!(ROOM_BROADCAST_DROPS_TOTAL).increment(1);
                    warn!(conn_id = %id, %project_id, "failed to send event to client");
                }
            }
        }
    }

    /// Broadcast an event to every live connection.
    pub async fn broadcast_all(&self, event: &ServerEvent) {
        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                warn!(event = %event.event, error = %e, "failed to serialize broadcast event");
                return;
            }
        };
        let conns = self.connections.read().await;
        for conn in conns.values() {
            if !conn.send(json.clone()) {
                counter!(ROOM_BROADCAST_DROPS_TOTAL).increment(1);
                warn!(conn_id = %conn.id(), "failed to send event to client");
            }
        }
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of connections in a project's room.
    pub async fn room_size(&self, project_id: ProjectId) -> usize {
        self.rooms
            .read()
            .await
            .get(&project_id)
            .map_or(0, HashSet::len)
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
