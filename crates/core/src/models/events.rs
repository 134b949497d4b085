//! Canonical room events
//!
//! The channel delivers most events under two names (a legacy and a
//! canonical alias). The networking layer maps either name to exactly one
//! variant here, so downstream merge logic never branches on wire names.

use crate::models::auction::{deserialize_money_lenient, AuctionStatus};
use crate::types::{AuctionId, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized event for one auction room
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    ViewerCount(ViewerCountPayload),
    State(AuctionStatePayload),
    NewBid(NewBidPayload),
    EndingSoon(EndingSoonPayload),
    Sold(SoldPayload),
    Expired(ExpiredPayload),
}

impl RoomEvent {
    /// The auction this event is tagged with, if the payload carries one
    ///
    /// `NEW_BID` payloads carry no id; they are routed by the room the
    /// subscriber has joined.
    pub fn auction_id(&self) -> Option<&AuctionId> {
        match self {
            RoomEvent::ViewerCount(p) => Some(&p.auction_id),
            RoomEvent::State(p) => Some(&p.auction_id),
            RoomEvent::NewBid(_) => None,
            RoomEvent::EndingSoon(p) => Some(&p.auction_id),
            RoomEvent::Sold(p) => Some(&p.auction_id),
            RoomEvent::Expired(p) => Some(&p.auction_id),
        }
    }
}

/// `VIEWER_COUNT` / `viewer_count`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerCountPayload {
    pub auction_id: AuctionId,
    pub count: u32,
}

/// `AUCTION_STATE` / `auction_state`: the server's full view of a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionStatePayload {
    pub auction_id: AuctionId,
    #[serde(deserialize_with = "deserialize_money_lenient")]
    pub current_price: Money,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    pub status: AuctionStatus,
    #[serde(default)]
    pub last_bid: Option<LastBid>,
}

/// Last-bid block inside a state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastBid {
    #[serde(deserialize_with = "deserialize_money_lenient")]
    pub amount: Money,
    pub bidder_name: String,
    pub timestamp: DateTime<Utc>,
}

/// `NEW_BID` / `new_bid`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBidPayload {
    #[serde(deserialize_with = "deserialize_money_lenient")]
    pub amount: Money,
    pub bidder_name: String,
    pub timestamp: DateTime<Utc>,
}

/// `AUCTION_ENDING_SOON`: server-reported seconds to the hard deadline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndingSoonPayload {
    pub auction_id: AuctionId,
    pub seconds_remaining: u32,
}

/// `AUCTION_SOLD`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoldPayload {
    pub auction_id: AuctionId,
    pub winner_name: String,
    #[serde(deserialize_with = "deserialize_money_lenient")]
    pub final_price: Money,
}

/// `AUCTION_EXPIRED`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiredPayload {
    pub auction_id: AuctionId,
}
