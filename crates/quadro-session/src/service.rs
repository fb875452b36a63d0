//! Token signing, validation, and revocation.

use crate::claims::SessionClaims;
use crate::errors::TokenError;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::RwLock;
use quadro_core::{ProjectId, UserId};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Validity applied to participation tokens.
///
/// Participation outlives any login session. The token only dies by explicit
/// revocation when the participant is removed from the project.
pub const PARTICIPATION_VALIDITY: Duration = Duration::from_secs(9999 * 365 * 24 * 60 * 60);

/// Signs and validates every token the realtime layer touches.
///
/// HS256 over a shared secret. Revocation is an in-memory set keyed by the
/// compact token string; with participation tokens effectively unbounded,
/// revocation is the only way one stops working.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    revoked: RwLock<HashSet<String>>,
}

impl TokenService {
    /// Build a service around a shared signing secret.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // No grace window on expiry.
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            revoked: RwLock::new(HashSet::new()),
        }
    }

    /// Sign a claim set into a compact token.
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding_key,
        )?)
    }

    /// Issue an identity token for a user, valid for `validity` from now.
    pub fn issue(&self, user_id: UserId, validity: Duration) -> Result<String, TokenError> {
        self.sign(&SessionClaims::for_user(user_id, validity))
    }

    /// Issue a participation token binding a user to a project.
    pub fn issue_participation(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<String, TokenError> {
        self.sign(&SessionClaims::for_user(user_id, PARTICIPATION_VALIDITY).with_project(project_id))
    }

    /// Validate a token and return its claims.
    ///
    /// Checks the revocation set first, then signature and expiry.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
        if self.revoked.read().contains(token) {
            return Err(TokenError::Revoked);
        }
        let data =
            jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Revoke a token. Subsequent validations fail with [`TokenError::Revoked`].
    pub fn revoke(&self, token: &str) {
        debug!("revoking token");
        let _ = self.revoked.write().insert(token.to_owned());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    const HOUR: Duration = Duration::from_secs(3600);

    fn service() -> TokenService {
        TokenService::new(b"test-secret")
    }

    #[test]
    fn sign_then_validate_roundtrips_claims() {
        let svc = service();
        let token = svc.issue(UserId::new(7), HOUR).unwrap();
        let claims = svc.validate(&token).unwrap();
        assert_eq!(claims.user_id(), Some(UserId::new(7)));
        assert_eq!(claims.project_id(), None);
    }

    #[test]
    fn participation_token_embeds_user_and_project() {
        let svc = service();
        let token = svc
            .issue_participation(UserId::new(7), ProjectId::new(42))
            .unwrap();
        let claims = svc.validate(&token).unwrap();
        assert_eq!(claims.user_id(), Some(UserId::new(7)));
        assert_eq!(claims.project_id(), Some(ProjectId::new(42)));
    }

    #[test]
    fn participation_validity_is_effectively_unbounded() {
        let svc = service();
        let token = svc
            .issue_participation(UserId::new(7), ProjectId::new(42))
            .unwrap();
        let claims = svc.validate(&token).unwrap();
        let lifetime = claims.expires_at() - claims.issued_at();
        // Centuries out, not a rolling session window.
        assert!(lifetime > 100 * 365 * 24 * 60 * 60);
    }

    #[test]
    fn garbage_is_rejected() {
        let svc = service();
        assert_matches!(svc.validate("not-a-token"), Err(TokenError::Invalid(_)));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = TokenService::new(b"other-secret")
            .issue(UserId::new(7), HOUR)
            .unwrap();
        assert_matches!(service().validate(&token), Err(TokenError::Invalid(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let stale: SessionClaims =
            serde_json::from_value(json!({"userId": 7, "iat": 0, "exp": 1})).unwrap();
        let token = svc.sign(&stale).unwrap();
        assert_matches!(svc.validate(&token), Err(TokenError::Invalid(_)));
    }

    #[test]
    fn revoked_token_stops_validating() {
        let svc = service();
        let token = svc
            .issue_participation(UserId::new(7), ProjectId::new(42))
            .unwrap();
        assert!(svc.validate(&token).is_ok());

        svc.revoke(&token);
        assert_matches!(svc.validate(&token), Err(TokenError::Revoked));
    }

    #[test]
    fn revoking_one_token_leaves_others_valid() {
        let svc = service();
        let a = svc
            .issue_participation(UserId::new(7), ProjectId::new(42))
            .unwrap();
        let b = svc
            .issue_participation(UserId::new(8), ProjectId::new(42))
            .unwrap();

        svc.revoke(&a);
        assert!(svc.validate(&b).is_ok());
    }
}
