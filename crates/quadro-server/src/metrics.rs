//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
#[must_use]
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket connection duration seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Client events dispatched total (counter, labels: event).
pub const EVENTS_DISPATCHED_TOTAL: &str = "events_dispatched_total";
/// Event rejections total (counter, labels: event, error).
pub const EVENT_ERRORS_TOTAL: &str = "event_errors_total";
/// Event dispatch duration seconds (histogram, labels: event).
pub const EVENT_DISPATCH_DURATION_SECONDS: &str = "event_dispatch_duration_seconds";
/// Room broadcast drops total (counter).
pub const ROOM_BROADCAST_DROPS_TOTAL: &str = "room_broadcast_drops_total";
/// Live project subscriptions (gauge).
pub const SUBSCRIPTIONS_ACTIVE: &str = "subscriptions_active";
