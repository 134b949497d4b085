//! The async room task
//!
//! One task per watched auction. It joins the room once the channel is
//! connected, drives [`RoomState`] from the event stream and a one-second
//! tick, publishes the projection on a watch channel, and leaves the room
//! on teardown. All projection mutation happens on this single task.

use std::sync::Arc;
use std::time::Duration;

use bidhall_core::{AuctionId, AuctionSnapshot, Money, RoomEvent};
use bidhall_networking::{ChannelState, RoomCommand, SocketHandle};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{RoomProjection, RoomState};

/// Injected winner-settlement callback, invoked at most once per room
/// with the final price
pub type BalanceDeductFn = Arc<dyn Fn(Money) + Send + Sync>;

/// Everything a room needs besides the channel plumbing
pub struct RoomParams {
    pub auction_id: AuctionId,
    /// Identity compared against `winnerName` on SOLD events
    pub viewer_identity: Option<String>,
    /// REST seed fetched by the surrounding UI
    pub snapshot: Option<AuctionSnapshot>,
    pub on_balance_deduct: Option<BalanceDeductFn>,
}

/// Handle to a mounted room
///
/// Dropping the handle cancels the task; prefer [`leave`](Self::leave)
/// when switching auctions so the old room's leave request and timer stop
/// complete before a new join is issued.
pub struct RoomHandle {
    projection_rx: watch::Receiver<RoomProjection>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RoomHandle {
    /// Latest projection
    pub fn projection(&self) -> RoomProjection {
        self.projection_rx.borrow().clone()
    }

    /// Watch projection updates (the presentation layer renders from this)
    pub fn watch(&self) -> watch::Receiver<RoomProjection> {
        self.projection_rx.clone()
    }

    /// Leave the room and wait for teardown to finish
    pub async fn leave(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for RoomHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawner for room tasks
pub struct AuctionRoom;

impl AuctionRoom {
    /// Mount a room on the session's channel connection
    pub fn spawn(socket: &SocketHandle, params: RoomParams) -> RoomHandle {
        Self::spawn_with(
            socket.subscribe(),
            socket.commands(),
            socket.watch_state(),
            params,
        )
    }

    /// Mount a room on explicit channel halves (tests use in-memory ones)
    pub fn spawn_with(
        events: broadcast::Receiver<RoomEvent>,
        commands: mpsc::Sender<RoomCommand>,
        connection: watch::Receiver<ChannelState>,
        params: RoomParams,
    ) -> RoomHandle {
        let mut state = RoomState::new(params.auction_id, params.viewer_identity);
        if let Some(ref snapshot) = params.snapshot {
            state.seed(snapshot);
        }

        let (projection_tx, projection_rx) = watch::channel(state.projection().clone());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_room(
            state,
            events,
            commands,
            connection,
            projection_tx,
            cancel.clone(),
            params.on_balance_deduct,
        ));

        RoomHandle {
            projection_rx,
            cancel,
            task: Some(task),
        }
    }
}

async fn run_room(
    mut state: RoomState,
    mut events: broadcast::Receiver<RoomEvent>,
    commands: mpsc::Sender<RoomCommand>,
    mut connection: watch::Receiver<ChannelState>,
    projection_tx: watch::Sender<RoomProjection>,
    cancel: CancellationToken,
    on_balance_deduct: Option<BalanceDeductFn>,
) {
    let auction_id = state.auction_id().clone();

    // "Not connected" means "do not join yet", never an error
    let joined = loop {
        if connection.borrow().connected {
            info!("Joining auction room: {}", auction_id);
            if let Err(e) = commands.send(RoomCommand::Join(auction_id.clone())).await {
                warn!("Failed to send join for {}: {}", auction_id, e);
                break false;
            }
            break true;
        }

        tokio::select! {
            _ = cancel.cancelled() => break false,
            changed = connection.changed() => {
                if changed.is_err() {
                    // Connection owner is gone (e.g. credential-less
                    // session); idle until the room is torn down
                    debug!("Channel unavailable, room {} waiting for teardown", auction_id);
                    cancel.cancelled().await;
                    break false;
                }
            }
        }
    };

    // The countdown interval; restarted whenever the timer is (re)armed so
    // the first decrement lands a full second after the arm
    let mut tick = new_tick();

    if !cancel.is_cancelled() {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                _ = tick.tick() => {
                    if state.timer_running() {
                        state.tick();
                        let _ = projection_tx.send(state.projection().clone());
                    }
                }

                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            let outcome = state.apply(&event);

                            if outcome.timer_armed {
                                tick = new_tick();
                            }

                            if let Some(final_price) = outcome.settlement_due {
                                if let Some(ref callback) = on_balance_deduct {
                                    // Fire-and-forget: the result re-enters
                                    // only through the normal event path
                                    callback(final_price);
                                }
                            }

                            let _ = projection_tx.send(state.projection().clone());
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Room {} dropped {} events, projection may lag", auction_id, n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Event stream closed for room {}", auction_id);
                            cancel.cancelled().await;
                            break;
                        }
                    }
                }
            }
        }
    }

    // Teardown: stop the countdown first, then tell the server we left,
    // so no event for this room can land after a successor joins
    state.stop_timer();
    let _ = projection_tx.send(state.projection().clone());

    if joined {
        info!("Leaving auction room: {}", auction_id);
        if let Err(e) = commands.try_send(RoomCommand::Leave(auction_id.clone())) {
            warn!("Failed to send leave for {}: {}", auction_id, e);
        }
    }
}

fn new_tick() -> tokio::time::Interval {
    let mut tick = interval_at(Instant::now() + Duration::from_secs(1), Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidhall_core::{
        AuctionStatus, NewBidPayload, SoldPayload, ViewerCountPayload,
    };
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Harness {
        events: broadcast::Sender<RoomEvent>,
        commands_rx: mpsc::Receiver<RoomCommand>,
        connection: watch::Sender<ChannelState>,
    }

    /// Opt-in test logging: RUST_LOG=debug cargo test -- --nocapture
    fn init_tracing() {
        use std::sync::Once;
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        });
    }

    fn harness(connected: bool) -> (Harness, RoomHandle, Arc<AtomicU32>) {
        init_tracing();
        let (events, events_rx) = broadcast::channel(64);
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let (connection, connection_rx) = watch::channel(ChannelState {
            connected,
            last_error: None,
        });

        let deductions = Arc::new(AtomicU32::new(0));
        let counter = deductions.clone();
        let callback: BalanceDeductFn = Arc::new(move |_price| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let handle = AuctionRoom::spawn_with(
            events_rx,
            commands_tx,
            connection_rx,
            RoomParams {
                auction_id: AuctionId::from("1"),
                viewer_identity: Some("bob".to_string()),
                snapshot: Some(AuctionSnapshot {
                    current_price: Money(100.0),
                    starting_price: Some(Money(50.0)),
                    ends_at: None,
                    status: AuctionStatus::Active,
                    bid_history: Vec::new(),
                }),
                on_balance_deduct: Some(callback),
            },
        );

        (
            Harness {
                events,
                commands_rx,
                connection,
            },
            handle,
            deductions,
        )
    }

    fn bid_event(amount: f64, bidder: &str) -> RoomEvent {
        RoomEvent::NewBid(NewBidPayload {
            amount: Money(amount),
            bidder_name: bidder.to_string(),
            timestamp: Utc.timestamp_opt(1_754_000_000, 0).unwrap(),
        })
    }

    fn sold_event(id: &str, winner: &str, price: f64) -> RoomEvent {
        RoomEvent::Sold(SoldPayload {
            auction_id: AuctionId::from(id),
            winner_name: winner.to_string(),
            final_price: Money(price),
        })
    }

    /// Let the room task drain its queues under a paused clock
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_joins_once_connected() {
        let (mut h, handle, _) = harness(true);

        settle().await;
        assert_eq!(
            h.commands_rx.try_recv().unwrap(),
            RoomCommand::Join(AuctionId::from("1"))
        );

        handle.leave().await;
        assert_eq!(
            h.commands_rx.try_recv().unwrap(),
            RoomCommand::Leave(AuctionId::from("1"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_deferred_until_connected() {
        let (mut h, handle, _) = harness(false);

        settle().await;
        assert!(h.commands_rx.try_recv().is_err());

        h.connection
            .send(ChannelState {
                connected: true,
                last_error: None,
            })
            .unwrap();
        settle().await;

        assert_eq!(
            h.commands_rx.try_recv().unwrap(),
            RoomCommand::Join(AuctionId::from("1"))
        );
        drop(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_projection_follows_bids() {
        let (h, handle, _) = harness(true);
        settle().await;

        h.events.send(bid_event(150.0, "alice")).unwrap();
        h.events.send(bid_event(200.0, "bob")).unwrap();
        settle().await;

        let projection = handle.projection();
        assert_eq!(projection.current_price, Some(Money(200.0)));
        assert_eq!(projection.bids.len(), 2);
        assert_eq!(projection.bids[0].bidder, "bob");
        assert_eq!(projection.auto_close_remaining, 10);

        handle.leave().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_once_per_second_and_rearm_resets() {
        let (h, handle, _) = harness(true);
        settle().await;

        h.events.send(bid_event(150.0, "alice")).unwrap();
        settle().await;
        assert_eq!(handle.projection().auto_close_remaining, 10);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(handle.projection().auto_close_remaining, 8);

        // Second bid within the same countdown: reset to 10, one interval
        h.events.send(bid_event(175.0, "bob")).unwrap();
        settle().await;
        assert_eq!(handle.projection().auto_close_remaining, 10);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(handle.projection().auto_close_remaining, 9);

        handle.leave().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_runs_dry_without_closing() {
        let (h, handle, _) = harness(true);
        settle().await;

        h.events.send(bid_event(150.0, "alice")).unwrap();
        settle().await;

        tokio::time::sleep(Duration::from_secs(15)).await;

        let projection = handle.projection();
        assert_eq!(projection.auto_close_remaining, 0);
        assert_eq!(projection.status, AuctionStatus::Active);

        handle.leave().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_sold_settles_once() {
        let (h, handle, deductions) = harness(true);
        settle().await;

        // Delivered once per alias by a confused server
        h.events.send(sold_event("1", "bob", 600.0)).unwrap();
        h.events.send(sold_event("1", "bob", 600.0)).unwrap();
        settle().await;

        let projection = handle.projection();
        assert_eq!(projection.status, AuctionStatus::Sold);
        assert!(projection.is_current_user_winner);
        assert_eq!(deductions.load(Ordering::SeqCst), 1);

        handle.leave().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_for_old_auction_do_not_leak_into_new_room() {
        let (h, old_room, _) = harness(true);
        settle().await;
        old_room.leave().await;

        // Mount the successor room on the same channel
        let (commands_tx, _commands_rx) = mpsc::channel(16);
        let (_conn_tx, conn_rx) = watch::channel(ChannelState {
            connected: true,
            last_error: None,
        });
        let new_room = AuctionRoom::spawn_with(
            h.events.subscribe(),
            commands_tx,
            conn_rx,
            RoomParams {
                auction_id: AuctionId::from("2"),
                viewer_identity: Some("bob".to_string()),
                snapshot: None,
                on_balance_deduct: None,
            },
        );
        settle().await;

        // A straggler for the old room arrives after the switch
        h.events.send(sold_event("1", "bob", 600.0)).unwrap();
        settle().await;

        let projection = new_room.projection();
        assert_eq!(projection.status, AuctionStatus::Active);
        assert!(projection.winner.is_none());
        assert!(!projection.is_current_user_winner);

        new_room.leave().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_viewer_count_defaults_and_updates() {
        let (h, handle, _) = harness(true);
        settle().await;

        assert_eq!(handle.projection().viewer_count, 0);

        h.events
            .send(RoomEvent::ViewerCount(ViewerCountPayload {
                auction_id: AuctionId::from("1"),
                count: 4,
            }))
            .unwrap();
        settle().await;

        assert_eq!(handle.projection().viewer_count, 4);

        handle.leave().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_stops_timer() {
        let (h, handle, _) = harness(true);
        settle().await;

        h.events.send(bid_event(150.0, "alice")).unwrap();
        settle().await;

        let mut projection_rx = handle.watch();
        handle.leave().await;

        let projection = projection_rx.borrow_and_update().clone();
        assert_eq!(projection.auto_close_remaining, 0);
    }
}
