//! Token and connect-time authentication errors.

use thiserror::Error;

/// Errors from signing or validating a token.
///
/// Internal only; clients never see these directly. The connect gate maps
/// them into [`AuthError`] and the subscription flow maps them into its own
/// taxonomy.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Malformed token, bad signature, or expired.
    #[error("token rejected: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    /// Token was explicitly revoked.
    #[error("token revoked")]
    Revoked,
}

/// Connect-time authentication failure. Fatal: the upgrade is refused and no
/// connection context is created.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The handshake is missing the socket token, the session token, or both.
    #[error("handshake missing credentials")]
    MissingCredentials,

    /// Both tokens were presented but at least one failed validation.
    #[error("handshake token rejected")]
    InvalidCredentials(#[source] TokenError),
}

impl AuthError {
    /// Message sent to the client alongside the refused upgrade.
    #[must_use]
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "Não autorizado.",
            Self::InvalidCredentials(_) => "Falha ao autenticar token.",
        }
    }
}
