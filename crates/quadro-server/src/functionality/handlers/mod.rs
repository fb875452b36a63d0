//! Event handler modules and registration.

pub mod chat;
pub mod members;
pub mod subscription;

use super::registry::EventRegistry;

/// Register every built-in and feature handler.
///
/// Called once at startup; the registry is immutable afterwards.
pub fn register_all(registry: &mut EventRegistry) {
    // Subscription handshake — authenticateless, must run before any
    // subscription state exists.
    registry.register_open("Subscribe", subscription::SubscribeHandler);
    registry.register_open("Unsubscribe", subscription::UnsubscribeHandler);

    // Feature modules
    registry.register_guarded("SendChatMessage", chat::SendChatMessageHandler);
    registry.register_guarded("FetchMembers", members::FetchMembersHandler);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test helpers
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test_helpers {
    use crate::functionality::context::EventContext;
    use crate::websocket::connection::ClientConnection;
    use crate::websocket::rooms::RoomRegistry;
    use quadro_core::{ConnectionId, ProjectId, UserDto, UserId};
    use quadro_projects::{InMemoryMembershipStore, MembershipService, ProjectDirectory};
    use quadro_session::{HandshakeAuth, TokenService, authenticate};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Wired services for handler and dispatch tests.
    pub(crate) struct TestFixture {
        pub ctx: EventContext,
        pub tokens: Arc<TokenService>,
    }

    pub(crate) fn make_fixture() -> TestFixture {
        let tokens = Arc::new(TokenService::new(b"test-secret"));
        let membership = Arc::new(MembershipService::new(Arc::new(
            InMemoryMembershipStore::new(),
        )));
        let directory = Arc::new(ProjectDirectory::new(tokens.clone(), membership));
        let ctx = EventContext::new(directory, Arc::new(RoomRegistry::new()));
        TestFixture { ctx, tokens }
    }

    impl TestFixture {
        /// A short-lived identity token for a user.
        pub(crate) fn session_token(&self, user_id: i64) -> String {
            self.tokens
                .issue(UserId::new(user_id), Duration::from_secs(3600))
                .unwrap()
        }

        /// Enroll a user into a project, returning the participation token.
        pub(crate) fn enroll(&self, user_id: i64, project_id: i64) -> String {
            self.ctx
                .directory
                .add_participant(
                    UserDto::new(user_id, format!("user-{user_id}")),
                    ProjectId::new(project_id),
                )
                .unwrap()
                .participation_token
                .unwrap()
        }

        /// Flip the subscribed flag directly (bypassing the Subscribe event).
        pub(crate) fn force_subscribe(&self, user_id: i64, project_id: i64) {
            self.ctx
                .directory
                .participant(ProjectId::new(project_id), UserId::new(user_id))
                .unwrap()
                .set_subscribed(true);
        }

        /// A registered connection presenting `socket_token`, as the
        /// handshake and upgrade path would build it.
        pub(crate) async fn connection(
            &self,
            socket_token: &str,
        ) -> (Arc<ClientConnection>, mpsc::Receiver<String>) {
            let context = authenticate(
                &HandshakeAuth::new(socket_token, self.session_token(999)),
                &["userId".to_owned()],
                &self.tokens,
            )
            .unwrap();
            let (tx, rx) = mpsc::channel(32);
            let conn = Arc::new(ClientConnection::new(ConnectionId::new(), context, tx));
            self.ctx.rooms.add(conn.clone()).await;
            (conn, rx)
        }
    }

    /// Pop the next queued frame as a parsed JSON value.
    pub(crate) fn next_frame(rx: &mut mpsc::Receiver<String>) -> serde_json::Value {
        let frame = rx.try_recv().expect("expected a queued frame");
        serde_json::from_str(&frame).unwrap()
    }
}
