//! Inbound frame dispatch — parses text frames as [`ClientEvent`]s and
//! routes them through the [`EventRegistry`].

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::connection::ClientConnection;
use crate::functionality::context::EventContext;
use crate::functionality::registry::{DispatchOutcome, EventRegistry};
use crate::functionality::types::{ClientEvent, ServerEvent};

/// Handle one incoming text frame.
///
/// This is the single error boundary of the router: a rejected event turns
/// into an `error` signal to the originating connection only. Malformed
/// frames and unknown event names are logged and dropped without a reply.
#[instrument(skip_all, fields(conn_id = %conn.id(), event))]
pub async fn handle_event(
    message: &str,
    conn: &Arc<ClientConnection>,
    registry: &EventRegistry,
    ctx: &EventContext,
) {
    let event: ClientEvent = match serde_json::from_str(message) {
        Ok(ev) => ev,
        Err(e) => {
            warn!(error = %e, "malformed frame dropped");
            return;
        }
    };
    let _ = tracing::Span::current().record("event", event.event.as_str());
    debug!("dispatching event");

    match registry.dispatch(&event.event, conn, event.data, ctx).await {
        DispatchOutcome::Completed => {}
        DispatchOutcome::UnknownEvent => {
            warn!(event = %event.event, "unknown event dropped");
        }
        DispatchOutcome::Rejected(err) => {
            debug!(event = %event.event, error = %err, "event rejected");
            let _ = conn.send_event(&ServerEvent::error(err.client_message()));
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
