//! Countdown timers and the store that owns them.
//!
//! Each [`Timer`] counts down in its own task and rings its chat when it
//! elapses. The [`TimerStore`] is shared by every chat; it starts timers,
//! cancels them on request, and sweeps the ones that already finished.

pub mod countdown;
pub mod store;

pub use countdown::{Timer, TimerState};
pub use store::{StoreError, TimerStore};
