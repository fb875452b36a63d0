//! # quadro-server
//!
//! Axum WebSocket gateway and functionality router for the quadro realtime
//! layer.
//!
//! - HTTP endpoints: health check, Prometheus metrics
//! - `WebSocket` gateway: two-token handshake, connection management,
//!   heartbeat, per-connection session loop
//! - Functionality router: named event handlers behind a membership guard
//!   chain, project-room broadcasting
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod functionality;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;
