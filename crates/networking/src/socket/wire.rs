//! Wire format for the event channel
//!
//! Frames are JSON text messages of the form `{"event": <name>, "data":
//! <payload>}`. Most inbound events exist under two names (a legacy alias
//! and a canonical one) and both must decode to the same [`RoomEvent`]
//! variant. The outbound join request is likewise emitted under both names
//! so either server generation accepts it.

use bidhall_core::{AuctionId, Error, Result, RoomEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One channel frame, either direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: &str, data: Value) -> Self {
        Frame {
            event: event.to_string(),
            data,
        }
    }

    /// Serialize to the JSON text the transport sends
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decode an inbound text frame into a canonical room event
///
/// Returns `Ok(None)` for frames that carry no room event: server `error`
/// frames (logged, non-fatal) and unknown event names. Known events with
/// malformed payloads are an `Err` so the caller can log and drop them.
pub fn decode_frame(text: &str) -> Result<Option<RoomEvent>> {
    let frame: Frame = serde_json::from_str(text)
        .map_err(|e| Error::InvalidData(format!("bad frame: {e}")))?;

    let event = match frame.event.as_str() {
        "VIEWER_COUNT" | "viewer_count" => {
            RoomEvent::ViewerCount(parse_payload(&frame.event, frame.data)?)
        }
        "AUCTION_STATE" | "auction_state" => {
            RoomEvent::State(parse_payload(&frame.event, frame.data)?)
        }
        "NEW_BID" | "new_bid" => RoomEvent::NewBid(parse_payload(&frame.event, frame.data)?),
        "AUCTION_ENDING_SOON" => RoomEvent::EndingSoon(parse_payload(&frame.event, frame.data)?),
        "AUCTION_SOLD" => RoomEvent::Sold(parse_payload(&frame.event, frame.data)?),
        "AUCTION_EXPIRED" => RoomEvent::Expired(parse_payload(&frame.event, frame.data)?),
        "error" => {
            tracing::warn!("Channel error event: {}", frame.data);
            return Ok(None);
        }
        other => {
            tracing::debug!("Ignoring unknown channel event: {}", other);
            return Ok(None);
        }
    };

    Ok(Some(event))
}

fn parse_payload<T: serde::de::DeserializeOwned>(event: &str, data: Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| Error::InvalidData(format!("bad {event} payload: {e}")))
}

/// Join frames for a room, one per accepted alias
pub fn join_frames(id: &AuctionId) -> [Frame; 2] {
    [
        Frame::new("join_room", Value::String(id.to_string())),
        Frame::new("joinAuction", Value::String(id.to_string())),
    ]
}

/// Leave frame for a room
pub fn leave_frame(id: &AuctionId) -> Frame {
    Frame::new("leaveAuction", Value::String(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidhall_core::Money;

    #[test]
    fn test_aliases_decode_to_same_event() {
        let legacy = r#"{"event": "NEW_BID", "data": {"amount": 600, "bidderName": "bob", "timestamp": "2026-08-05T10:00:00Z"}}"#;
        let canonical = r#"{"event": "new_bid", "data": {"amount": 600, "bidderName": "bob", "timestamp": "2026-08-05T10:00:00Z"}}"#;

        let a = decode_frame(legacy).unwrap().unwrap();
        let b = decode_frame(canonical).unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_state_frame_decodes_with_last_bid() {
        let text = r#"{"event": "auction_state", "data": {
            "auctionId": 5,
            "currentPrice": 500,
            "endsAt": "2026-08-05T12:00:00Z",
            "status": "active",
            "lastBid": {"amount": 500, "bidderName": "alice", "timestamp": "2026-08-05T10:00:00Z"}
        }}"#;

        match decode_frame(text).unwrap().unwrap() {
            RoomEvent::State(payload) => {
                assert_eq!(payload.auction_id.as_str(), "5");
                assert_eq!(payload.current_price, Money(500.0));
                assert_eq!(payload.last_bid.unwrap().bidder_name, "alice");
            }
            other => panic!("expected state event, got {other:?}"),
        }
    }

    #[test]
    fn test_error_and_unknown_events_are_dropped() {
        let error = r#"{"event": "error", "data": {"message": "boom"}}"#;
        let unknown = r#"{"event": "AUCTION_PAUSED", "data": {}}"#;
        assert!(decode_frame(error).unwrap().is_none());
        assert!(decode_frame(unknown).unwrap().is_none());
    }

    #[test]
    fn test_malformed_known_payload_is_an_error() {
        let text = r#"{"event": "AUCTION_SOLD", "data": {"auctionId": 5}}"#;
        assert!(decode_frame(text).is_err());
    }

    #[test]
    fn test_join_emits_both_aliases() {
        let frames = join_frames(&AuctionId::from("9"));
        assert_eq!(frames[0].event, "join_room");
        assert_eq!(frames[1].event, "joinAuction");
        assert_eq!(frames[0].data, frames[1].data);
    }
}
