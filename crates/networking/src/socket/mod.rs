//! Real-time event channel for auction rooms
//!
//! [`manager`] owns the single websocket connection for a session;
//! [`wire`] normalizes the historically-aliased wire event names into the
//! canonical [`bidhall_core::RoomEvent`] union before anything downstream
//! sees them.

mod manager;
pub mod wire;

pub use manager::{connect, ChannelState, RoomCommand, SocketConfig, SocketHandle};
