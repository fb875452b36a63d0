//! Claim set carried by every quadro token.

use chrono::Utc;
use quadro_core::{ProjectId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Claims embedded in a signed token.
///
/// Login sessions carry `userId` only; participation tokens bind `userId` to
/// a `projectId`. Anything else the issuing flow adds lands in the flattened
/// extras and stays addressable by name through [`SessionClaims::field`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,
    #[serde(rename = "projectId", skip_serializing_if = "Option::is_none")]
    project_id: Option<ProjectId>,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl SessionClaims {
    /// Build claims for a user, valid for `validity` from now.
    #[must_use]
    pub fn for_user(user_id: impl Into<UserId>, validity: Duration) -> Self {
        let iat = Utc::now().timestamp();
        let exp = iat.saturating_add(i64::try_from(validity.as_secs()).unwrap_or(i64::MAX));
        Self {
            user_id: Some(user_id.into()),
            project_id: None,
            iat,
            exp,
            extra: Map::new(),
        }
    }

    /// Bind the claims to a project (participation tokens).
    #[must_use]
    pub fn with_project(mut self, project_id: impl Into<ProjectId>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Attach an extra named claim.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.extra.insert(name.into(), value.into());
        self
    }

    /// User the token was issued to.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Project binding, present on participation tokens.
    #[must_use]
    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    /// Issued-at, seconds since the epoch.
    #[must_use]
    pub fn issued_at(&self) -> i64 {
        self.iat
    }

    /// Expiry, seconds since the epoch.
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.exp
    }

    /// Look up a claim by its wire name.
    ///
    /// Typed claims and extras resolve through the same call so the handshake
    /// projection can copy any configured field without knowing its kind.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "userId" => self.user_id.map(|id| Value::from(id.value())),
            "projectId" => self.project_id.map(|id| Value::from(id.value())),
            "iat" => Some(Value::from(self.iat)),
            "exp" => Some(Value::from(self.exp)),
            _ => self.extra.get(name).cloned(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn wire_format_is_camel_case() {
        let claims = SessionClaims::for_user(7, HOUR).with_project(42);
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], 7);
        assert_eq!(json["projectId"], 42);
        assert!(json["iat"].is_i64());
        assert!(json["exp"].is_i64());
    }

    #[test]
    fn project_binding_is_omitted_when_absent() {
        let claims = SessionClaims::for_user(7, HOUR);
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("projectId").is_none());
    }

    #[test]
    fn expiry_is_issue_time_plus_validity() {
        let claims = SessionClaims::for_user(7, HOUR);
        assert_eq!(claims.expires_at() - claims.issued_at(), 3600);
    }

    #[test]
    fn extras_flatten_onto_the_wire() {
        let claims = SessionClaims::for_user(7, HOUR).with_field("role", "admin");
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["role"], "admin");

        let back: SessionClaims = serde_json::from_value(json).unwrap();
        assert_eq!(back.field("role"), Some(json!("admin")));
    }

    #[test]
    fn field_resolves_typed_claims() {
        let claims = SessionClaims::for_user(7, HOUR).with_project(42);
        assert_eq!(claims.field("userId"), Some(json!(7)));
        assert_eq!(claims.field("projectId"), Some(json!(42)));
        assert_eq!(claims.field("iat"), Some(json!(claims.issued_at())));
    }

    #[test]
    fn field_misses_return_none() {
        let claims = SessionClaims::for_user(7, HOUR);
        assert_eq!(claims.field("projectId"), None);
        assert_eq!(claims.field("nope"), None);
    }

    #[test]
    fn deserializes_without_optional_claims() {
        let claims: SessionClaims = serde_json::from_value(json!({"iat": 0, "exp": 10})).unwrap();
        assert_eq!(claims.user_id(), None);
        assert_eq!(claims.project_id(), None);
    }
}
