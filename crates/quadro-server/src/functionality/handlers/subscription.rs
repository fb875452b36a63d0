//! Subscription handshake: the events that flip routing on and off.
//!
//! Both events are registered open because they run before (or while
//! tearing down) the subscription state the guard chain checks. They do
//! their own resolution instead, and every check happens before any
//! mutation so a failed attempt leaves rooms and flags untouched.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::gauge;
use quadro_projects::{Participant, Project};
use serde_json::Value;
use tracing::{debug, info};

use crate::functionality::context::EventContext;
use crate::functionality::errors::EventError;
use crate::functionality::registry::OpenHandler;
use crate::functionality::types::{ServerEvent, project_id_field};
use crate::metrics::SUBSCRIPTIONS_ACTIVE;
use crate::websocket::connection::ClientConnection;

/// Resolve the payload's project and the participant behind the
/// connection's socket token.
///
/// A missing or unknown project id reads as "project not found" here, not
/// as a malformed payload; the subscription events predate any routing
/// state, so there is no guard chain to distinguish the two.
fn resolve(
    data: &Value,
    conn: &Arc<ClientConnection>,
    ctx: &EventContext,
) -> Result<(Arc<Project>, Arc<Participant>), EventError> {
    let project = project_id_field(data)
        .and_then(|id| ctx.directory.project(id))
        .ok_or(EventError::ProjectNotFound)?;

    // The socket token was validated at connect time but the user id is
    // recovered from its claims here, not trusted from the payload.
    let claims = ctx
        .tokens
        .validate(conn.context().socket_token())
        .map_err(|_| EventError::UserNotFound)?;
    let user_id = claims.user_id().ok_or(EventError::UserNotFound)?;
    let participant = project.participant(user_id).ok_or(EventError::UserNotFound)?;
    Ok((project, participant))
}

/// `Subscribe {projectId}` — join the project's broadcast room and flip the
/// participant's subscribed flag. Idempotent; repeats re-emit the
/// confirmation.
pub struct SubscribeHandler;

#[async_trait]
impl OpenHandler for SubscribeHandler {
    async fn handle(
        &self,
        conn: &Arc<ClientConnection>,
        data: Value,
        ctx: &EventContext,
    ) -> Result<(), EventError> {
        let (project, participant) = resolve(&data, conn, ctx)?;

        ctx.rooms.join(project.project_id(), conn.id()).await;
        if !participant.is_subscribed() {
            participant.set_subscribed(true);
            gauge!(SUBSCRIPTIONS_ACTIVE).increment(1.0);
        }
        info!(
            conn_id = %conn.id(),
            user_id = %participant.user_id(),
            project_id = %project.project_id(),
            "participant subscribed"
        );

        let _ = conn.send_event(&ServerEvent::named("subscribedToProject"));
        Ok(())
    }
}

/// `Unsubscribe {projectId}` — leave the room and flip the flag back.
/// Membership records and the participation token are untouched; the
/// participant can subscribe again on the same connection.
pub struct UnsubscribeHandler;

#[async_trait]
impl OpenHandler for UnsubscribeHandler {
    async fn handle(
        &self,
        conn: &Arc<ClientConnection>,
        data: Value,
        ctx: &EventContext,
    ) -> Result<(), EventError> {
        let (project, participant) = resolve(&data, conn, ctx)?;

        ctx.rooms.leave(project.project_id(), conn.id()).await;
        if participant.is_subscribed() {
            participant.set_subscribed(false);
            gauge!(SUBSCRIPTIONS_ACTIVE).decrement(1.0);
        }
        debug!(
            conn_id = %conn.id(),
            user_id = %participant.user_id(),
            project_id = %project.project_id(),
            "participant unsubscribed"
        );

        let _ = conn.send_event(&ServerEvent::named("unsubscribedFromProject"));
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
