//! # quadro-core
//!
//! Foundation types for the quadro realtime backend.
//!
//! This crate provides the shared vocabulary the other quadro crates depend on:
//!
//! - **Branded IDs**: `UserId`, `ProjectId` (integer keys issued by the
//!   persistence layer) and `ConnectionId` (UUID v7, minted per socket)
//! - **User DTO**: the identity payload that crosses the realtime boundary

#![deny(unsafe_code)]

pub mod ids;
pub mod users;

pub use ids::{ConnectionId, ProjectId, UserId};
pub use users::UserDto;
