//! Shared service handles passed to every event handler.

use crate::websocket::rooms::RoomRegistry;
use quadro_projects::{MembershipService, ProjectDirectory};
use quadro_session::TokenService;
use std::sync::Arc;

/// Everything a registered handler may need beyond the event itself.
///
/// Cloning is cheap; all fields are shared handles. Handlers receive a
/// reference and must not hold it across their own await points longer than
/// the dispatch that invoked them.
#[derive(Clone)]
pub struct EventContext {
    /// Live project registry and participant lifecycle.
    pub directory: Arc<ProjectDirectory>,
    /// Durable membership relationships.
    pub membership: Arc<MembershipService>,
    /// Token validation, for handlers that re-check credentials.
    pub tokens: Arc<TokenService>,
    /// Project broadcast rooms.
    pub rooms: Arc<RoomRegistry>,
}

impl EventContext {
    /// Build a context around a directory and the room registry.
    ///
    /// Membership and token handles come from the directory so that all three
    /// always refer to the same backing services.
    #[must_use]
    pub fn new(directory: Arc<ProjectDirectory>, rooms: Arc<RoomRegistry>) -> Self {
        let membership = directory.membership().clone();
        let tokens = directory.tokens().clone();
        Self {
            directory,
            membership,
            tokens,
            rooms,
        }
    }
}
