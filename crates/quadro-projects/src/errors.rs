//! Registry errors.

use quadro_session::TokenError;
use thiserror::Error;

/// Failures raised by the participant lifecycle.
///
/// Internal to the backend; the realtime wire surface never carries these.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Minting the participation token failed.
    #[error("participation token issuance failed: {0}")]
    TokenIssuance(#[from] TokenError),
}
