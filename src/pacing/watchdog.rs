use tokio::time::{Duration, Instant};

/// Default silence period before the idle ping, in milliseconds.
pub const DEFAULT_INACTIVITY_MS: u64 = 300_000;

/// Synthetic inbound line raised on countdown expiry. It flows through the
/// normal inbound pipeline so the brain can react to silence.
pub const IDLE_PING: &str = "system pings.";

/// Counts down after the reply queue drains; any newly queued output cancels
/// the countdown. A zero timeout disables the watchdog entirely.
#[derive(Debug)]
pub struct InactivityWatchdog {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl InactivityWatchdog {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            deadline: None,
        }
    }

    /// Queue drained: start (or restart) the countdown.
    pub fn on_empty(&mut self, now: Instant) {
        if let Some(timeout) = self.timeout {
            self.deadline = Some(now + timeout);
        }
    }

    /// New output queued: cancel any pending countdown.
    pub fn on_queued(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Countdown expired: disarm and yield the synthetic inbound line.
    pub fn fire(&mut self) -> &'static str {
        self.deadline = None;
        IDLE_PING
    }
}
