//! Bidhall Engine - Auction room reconciliation
//!
//! Merges a per-auction real-time event stream with an initial REST
//! snapshot into a single consistent projection, runs the local
//! auto-close countdown, and detects the "current user won" condition
//! exactly once.

pub mod room;

pub use room::{
    AuctionRoom, AutoCloseTimer, BalanceDeductFn, RoomHandle, RoomParams, RoomProjection,
    RoomState, Winner,
};
