//! Connect-time authentication and claim projection.
//!
//! A connecting socket presents two credentials: the socket token (on project
//! sockets this is the participation token handed out at invite time) and the
//! session token from the login flow. Both must validate before the upgrade
//! is accepted. On success a caller-chosen list of claim fields is projected
//! onto the connection context, reading the socket-token claims first and
//! falling back to the session-token claims per field.

use crate::errors::AuthError;
use crate::service::TokenService;
use quadro_core::UserId;
use serde_json::{Map, Value};
use tracing::debug;

/// Credentials presented with the upgrade request.
#[derive(Clone, Debug, Default)]
pub struct HandshakeAuth {
    /// Transport credential; the participation token on project sockets.
    pub socket_token: Option<String>,
    /// Login session credential.
    pub session_token: Option<String>,
}

impl HandshakeAuth {
    /// Build a handshake with both credentials present.
    #[must_use]
    pub fn new(socket_token: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            socket_token: Some(socket_token.into()),
            session_token: Some(session_token.into()),
        }
    }
}

/// Authenticated state attached to a live connection.
///
/// Immutable once built. The router compares `socket_token` against stored
/// participation tokens; the projected fields serve handlers that only need
/// identity claims.
#[derive(Clone, Debug)]
pub struct ConnectionContext {
    socket_token: String,
    session_token: String,
    fields: Map<String, Value>,
}

impl ConnectionContext {
    /// The raw socket token presented at connect time.
    #[must_use]
    pub fn socket_token(&self) -> &str {
        &self.socket_token
    }

    /// The raw login session token presented at connect time.
    #[must_use]
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// A projected claim field, if the decoder list requested it and either
    /// token carried it.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The projected `userId` claim.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.field("userId").and_then(Value::as_i64).map(UserId::new)
    }
}

/// Validate both handshake tokens and project the `decoder` claim fields.
///
/// Either token missing refuses the connection outright; either token failing
/// validation refuses it with the authentication message. A decoder field
/// absent from both claim sets is skipped with a debug log and the remaining
/// fields still project.
pub fn authenticate(
    auth: &HandshakeAuth,
    decoder: &[String],
    tokens: &TokenService,
) -> Result<ConnectionContext, AuthError> {
    let (Some(socket_token), Some(session_token)) =
        (auth.socket_token.as_deref(), auth.session_token.as_deref())
    else {
        return Err(AuthError::MissingCredentials);
    };

    let socket_claims = tokens
        .validate(socket_token)
        .map_err(AuthError::InvalidCredentials)?;
    let session_claims = tokens
        .validate(session_token)
        .map_err(AuthError::InvalidCredentials)?;

    let mut fields = Map::new();
    for name in decoder {
        let value = socket_claims
            .field(name)
            .filter(|v| !v.is_null())
            .or_else(|| session_claims.field(name).filter(|v| !v.is_null()));
        match value {
            Some(value) => {
                let _ = fields.insert(name.clone(), value);
            }
            None => {
                // Non-fatal: handlers that need the field fail their own
                // lookups later, the connection itself stands.
                debug!(field = %name, "handshake claim absent from both tokens");
            }
        }
    }

    Ok(ConnectionContext {
        socket_token: socket_token.to_owned(),
        session_token: session_token.to_owned(),
        fields,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
