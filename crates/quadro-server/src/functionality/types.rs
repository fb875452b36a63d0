//! Wire-format types for the realtime event protocol.

use quadro_core::ProjectId;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Incoming event frame from a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientEvent {
    /// Event name (e.g. `Subscribe`, `SendChatMessage`).
    pub event: String,
    /// Event payload; `null` when the client sends none.
    #[serde(default)]
    pub data: Value,
}

/// Outgoing event frame to a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerEvent {
    /// Event name (e.g. `subscribedToProject`, `error`).
    pub event: String,
    /// Event payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ServerEvent {
    /// Build a payload-less event.
    pub fn named(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: None,
        }
    }

    /// Build an event carrying a payload.
    pub fn with_data(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data: Some(data),
        }
    }

    /// Build the `error {message}` signal.
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_data("error", json!({ "message": message.into() }))
    }
}

/// Extract the `projectId` field from an event payload.
///
/// Clients historically sent the id both as a JSON integer and as an integer
/// string (object keys coerce on the web side), so both are accepted. Missing,
/// null, or non-integer values yield `None`.
#[must_use]
pub fn project_id_field(data: &Value) -> Option<ProjectId> {
    match data.get("projectId")? {
        Value::Number(n) => n.as_i64().map(ProjectId::new),
        Value::String(s) => s.trim().parse::<i64>().ok().map(ProjectId::new),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
