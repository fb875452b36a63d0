//! The functionality router: wire types, handler registry, and the built-in
//! and feature event handlers.

pub mod context;
pub mod errors;
pub mod handlers;
pub mod registry;
pub mod types;
