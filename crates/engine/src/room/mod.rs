//! One auction room: projection state, countdown timer, and the async
//! task that drives them from the live event stream

mod reconciler;
mod state;
mod timer;

pub use reconciler::{AuctionRoom, BalanceDeductFn, RoomHandle, RoomParams};
pub use state::{ApplyOutcome, RoomProjection, RoomState, Winner};
pub use timer::{AutoCloseTimer, AUTO_CLOSE_SECS};
