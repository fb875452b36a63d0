//! # quadro-session
//!
//! Session tokens and connect-time authentication for the quadro realtime
//! backend.
//!
//! - **Claims**: `SessionClaims` carried by every token (user, optional
//!   project binding, issue/expiry timestamps, open extras)
//! - **Token service**: HS256 sign/validate via `jsonwebtoken`, with an
//!   in-memory revocation set for the long-lived participation tokens
//! - **Handshake**: the two-token connect gate. Both the socket token and the
//!   login session token must validate before a connection context is built;
//!   a caller-chosen list of claim fields is then projected onto it.

#![deny(unsafe_code)]

pub mod claims;
pub mod errors;
pub mod handshake;
pub mod service;

pub use claims::SessionClaims;
pub use errors::{AuthError, TokenError};
pub use handshake::{ConnectionContext, HandshakeAuth, authenticate};
pub use service::{PARTICIPATION_VALIDITY, TokenService};
