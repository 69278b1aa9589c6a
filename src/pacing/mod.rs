//! Outbound pacing: the reply queue that releases lines at typing speed and
//! the inactivity watchdog that pings the conversation after silence.

pub mod queue;
pub mod watchdog;

pub use queue::DelayedReplyQueue;
pub use watchdog::InactivityWatchdog;
