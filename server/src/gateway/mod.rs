//! Real-time transport: one WebSocket per client, grouped into per-game rooms.

mod connection;
pub mod protocol;
mod registry;
mod ws;

pub use connection::Connection;
pub use protocol::{ClientMessage, ServerMessage};
pub use registry::{ConnectionId, ConnectionRegistry, Notice};
pub use ws::ws_handler;
