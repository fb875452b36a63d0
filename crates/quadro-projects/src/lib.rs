//! # quadro-projects
//!
//! Project registry, participant lifecycle, and membership relationships for
//! the quadro realtime backend.
//!
//! - **Project / Participant**: the live aggregate a realtime session routes
//!   against. Participants hold their participation token and a subscribed
//!   flag; both mutate only through the operations here and the subscription
//!   protocol.
//! - **`ProjectDirectory`**: in-memory registry keyed by project ID, created
//!   lazily as participants are enrolled.
//! - **Membership**: the durable (user, project) relationship, kept behind a
//!   store trait because the wider application owns the backing collection.

#![deny(unsafe_code)]

pub mod directory;
pub mod errors;
pub mod membership;
pub mod project;

pub use directory::{AddParticipantOutcome, ProjectDirectory};
pub use errors::DirectoryError;
pub use membership::{
    InMemoryMembershipStore, MembershipRecord, MembershipService, MembershipStore,
};
pub use project::{Participant, Project};
