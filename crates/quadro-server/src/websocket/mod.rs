//! WebSocket gateway: connection state, project rooms, and the per-client
//! session lifecycle.

pub mod connection;
pub mod handler;
pub mod heartbeat;
pub mod rooms;
pub mod session;
