//! Member listing for a project.

use std::sync::Arc;

use async_trait::async_trait;
use quadro_projects::Project;
use serde_json::{Value, json};

use crate::functionality::context::EventContext;
use crate::functionality::errors::EventError;
use crate::functionality::registry::ProjectHandler;
use crate::functionality::types::ServerEvent;
use crate::websocket::connection::ClientConnection;

/// `FetchMembers {projectId}` — reply to the requester with the project's
/// durable membership records. No broadcast; other connections see nothing.
pub struct FetchMembersHandler;

#[async_trait]
impl ProjectHandler for FetchMembersHandler {
    async fn handle(
        &self,
        project: Arc<Project>,
        conn: &Arc<ClientConnection>,
        _data: Value,
        ctx: &EventContext,
    ) -> Result<(), EventError> {
        let members = ctx.membership.members_of_project(project.project_id());
        let _ = conn.send_event(&ServerEvent::with_data(
            "membersFetched",
            json!({ "members": members }),
        ));
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
