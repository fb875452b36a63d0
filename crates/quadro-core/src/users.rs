//! User identity payload.

use crate::ids::UserId;
use serde::{Deserialize, Serialize};

/// The slice of a user account that crosses into the realtime layer.
///
/// Account management lives elsewhere; the realtime layer only needs enough
/// identity to key participants and label outgoing events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    /// Persistence-layer user key.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
}

impl UserDto {
    /// Build a DTO from its parts.
    #[must_use]
    pub fn new(user_id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
        }
    }
}
