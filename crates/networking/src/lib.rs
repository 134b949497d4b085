//! Bidhall Networking - HTTP client, real-time channel, and API wrappers

pub mod api;
pub mod http;
pub mod socket;

pub use http::ApiClient;
pub use socket::{ChannelState, RoomCommand, SocketConfig, SocketHandle};
