//! Projection state and event merge rules for one auction room
//!
//! [`RoomState`] is a synchronous reducer: seed it from the REST
//! snapshot, then apply canonical events strictly in delivery order. All
//! async plumbing lives in the reconciler; everything here is directly
//! testable without a runtime.

use bidhall_core::{
    AuctionId, AuctionSnapshot, AuctionStatus, Bid, LastBid, Money, RoomEvent,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::timer::AutoCloseTimer;

/// Winning bidder, set at most once per auction via a SOLD event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub name: String,
    pub price: Money,
}

/// The merged, always-current view of one auction
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomProjection {
    /// Server-reported, best effort
    pub viewer_count: u32,
    /// Newest first
    pub bids: Vec<Bid>,
    pub current_price: Option<Money>,
    pub status: AuctionStatus,
    pub ends_at: Option<DateTime<Utc>>,
    /// Local urgency countdown, not authoritative
    pub auto_close_remaining: u32,
    /// Server-reported seconds to the hard deadline, independent of the
    /// local countdown
    pub ending_soon_seconds: Option<u32>,
    pub winner: Option<Winner>,
    pub is_current_user_winner: bool,
}

/// What a single applied event asked the surrounding task to do
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ApplyOutcome {
    /// The countdown was (re)armed; the driving interval must restart
    pub timer_armed: bool,
    /// The viewing user won: invoke the balance-deduction callback with
    /// this final price. Emitted at most once per room.
    pub settlement_due: Option<Money>,
}

/// Reducer for one auction room
pub struct RoomState {
    auction_id: AuctionId,
    viewer_identity: Option<String>,
    projection: RoomProjection,
    timer: AutoCloseTimer,
    /// Winner handling already ran for this room ("first SOLD wins")
    settled: bool,
    /// A NEW_BID has driven the price; stale snapshots may not lower it
    price_from_bid: bool,
}

impl RoomState {
    pub fn new(auction_id: AuctionId, viewer_identity: Option<String>) -> Self {
        RoomState {
            auction_id,
            viewer_identity,
            projection: RoomProjection::default(),
            timer: AutoCloseTimer::default(),
            settled: false,
            price_from_bid: false,
        }
    }

    /// One-time seeding from the REST snapshot
    ///
    /// Seeding never arms the countdown; only live activity does.
    pub fn seed(&mut self, snapshot: &AuctionSnapshot) {
        self.projection.current_price = Some(snapshot.current_price);
        self.projection.status = snapshot.status;
        if snapshot.ends_at.is_some() {
            self.projection.ends_at = snapshot.ends_at;
        }

        let mut bids = snapshot.bid_history.clone();
        bids.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.projection.bids = bids;
    }

    /// Apply one event, strictly in delivery order
    ///
    /// Events tagged with a different auction id are ignored wholesale;
    /// `NEW_BID` carries no id and is trusted to the joined room.
    pub fn apply(&mut self, event: &RoomEvent) -> ApplyOutcome {
        if let Some(id) = event.auction_id() {
            if *id != self.auction_id {
                debug!(
                    "Ignoring event for auction {} while watching {}",
                    id, self.auction_id
                );
                return ApplyOutcome::default();
            }
        }

        let mut outcome = ApplyOutcome::default();

        match event {
            RoomEvent::ViewerCount(payload) => {
                self.projection.viewer_count = payload.count;
            }

            RoomEvent::State(payload) => {
                self.apply_snapshot_price(payload.current_price);
                self.projection.status = payload.status;

                if payload.ends_at.is_some() {
                    self.projection.ends_at = payload.ends_at;
                }

                if payload.status == AuctionStatus::Active {
                    if let Some(ref last_bid) = payload.last_bid {
                        // A bid is in flight: show it and start the urgency
                        // countdown, replacing whatever history was seeded
                        self.projection.bids = vec![bid_from_last(last_bid)];
                        self.timer.arm();
                        outcome.timer_armed = true;
                    }
                } else if self.timer.is_running() {
                    self.timer.stop();
                }
            }

            RoomEvent::NewBid(payload) => {
                self.projection.current_price = Some(payload.amount);
                self.price_from_bid = true;
                // A bid can only land on a live auction
                self.projection.status = AuctionStatus::Active;
                self.projection.bids.insert(
                    0,
                    Bid {
                        id: payload.timestamp.timestamp_millis(),
                        bidder: payload.bidder_name.clone(),
                        amount: payload.amount,
                        timestamp: payload.timestamp,
                    },
                );
                self.timer.arm();
                outcome.timer_armed = true;
            }

            RoomEvent::EndingSoon(payload) => {
                self.projection.ending_soon_seconds = Some(payload.seconds_remaining);
            }

            RoomEvent::Sold(payload) => {
                self.projection.status = AuctionStatus::Sold;
                self.timer.stop();

                if !self.settled {
                    self.settled = true;
                    self.projection.winner = Some(Winner {
                        name: payload.winner_name.clone(),
                        price: payload.final_price,
                    });

                    if self.viewer_identity.as_deref() == Some(payload.winner_name.as_str()) {
                        info!(
                            "Auction {} won by current user at {}",
                            self.auction_id, payload.final_price
                        );
                        self.projection.is_current_user_winner = true;
                        outcome.settlement_due = Some(payload.final_price);
                    }
                } else {
                    debug!("Duplicate SOLD for auction {}, already settled", self.auction_id);
                }
            }

            RoomEvent::Expired(_) => {
                self.projection.status = AuctionStatus::Expired;
                self.timer.stop();
            }
        }

        self.projection.auto_close_remaining = self.timer.remaining();
        outcome
    }

    /// Snapshot prices may not undo a bid: once a NEW_BID has set the
    /// price, a concurrently-arriving snapshot can only raise it
    fn apply_snapshot_price(&mut self, price: Money) {
        if self.price_from_bid {
            if let Some(current) = self.projection.current_price {
                if price < current {
                    warn!(
                        "Stale snapshot price {} below bid-driven {}, keeping the bid",
                        price, current
                    );
                    return;
                }
            }
        }
        self.projection.current_price = Some(price);
    }

    /// Advance the countdown one second
    pub fn tick(&mut self) {
        if self.timer.tick() {
            // Local urgency signal only; closure authority stays with the
            // SOLD/EXPIRED events
            debug!("Auto-close countdown expired for auction {}", self.auction_id);
        }
        self.projection.auto_close_remaining = self.timer.remaining();
    }

    /// Stop the countdown (room teardown)
    pub fn stop_timer(&mut self) {
        self.timer.stop();
        self.projection.auto_close_remaining = 0;
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn projection(&self) -> &RoomProjection {
        &self.projection
    }

    pub fn auction_id(&self) -> &AuctionId {
        &self.auction_id
    }
}

fn bid_from_last(last_bid: &LastBid) -> Bid {
    Bid {
        id: last_bid.timestamp.timestamp_millis(),
        bidder: last_bid.bidder_name.clone(),
        amount: last_bid.amount,
        timestamp: last_bid.timestamp,
    }
}
