//! Project chat: the feature handler exercising the guarded broadcast path.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use quadro_projects::Project;
use serde_json::{Value, json};
use tracing::debug;

use crate::functionality::context::EventContext;
use crate::functionality::errors::EventError;
use crate::functionality::registry::ProjectHandler;
use crate::functionality::types::ServerEvent;
use crate::websocket::connection::ClientConnection;

/// `SendChatMessage {projectId, message}` — fan a chat line out to the
/// project's room.
///
/// The sender's identity comes from the participant record behind the
/// connection's socket token, never from the payload.
pub struct SendChatMessageHandler;

#[async_trait]
impl ProjectHandler for SendChatMessageHandler {
    async fn handle(
        &self,
        project: Arc<Project>,
        conn: &Arc<ClientConnection>,
        data: Value,
        ctx: &EventContext,
    ) -> Result<(), EventError> {
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| EventError::handler(r#""message" não informado."#))?;
        let participant = project
            .participant_by_token(conn.context().socket_token())
            .ok_or(EventError::NotProjectMember)?;

        debug!(
            project_id = %project.project_id(),
            user_id = %participant.user_id(),
            "chat message received"
        );
        let event = ServerEvent::with_data(
            "newChatMessage",
            json!({
                "userId": participant.user_id(),
                "message": message,
                "sentAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        );
        ctx.rooms.broadcast_to_project(project.project_id(), &event).await;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
