use std::collections::VecDeque;

use tokio::time::{Duration, Instant};

/// Fallback rate when the configured speed is zero or absent. 200-300 cpm is
/// fast for a human but slow for a bot; we deliberately stay above reading
/// speed without flooding the room (several bots may share one).
pub const DEFAULT_CPM: u32 = 800;

/// FIFO of outgoing lines, released one at a time at a rate proportional to
/// line length. At most one release deadline is armed at any time; the
/// reactor loop drives the actual timer from `deadline()`.
#[derive(Debug)]
pub struct DelayedReplyQueue {
    items: VecDeque<String>,
    cpm: u32,
    deadline: Option<Instant>,
}

impl DelayedReplyQueue {
    pub fn new(chars_per_minute: u32) -> Self {
        Self {
            items: VecDeque::new(),
            cpm: if chars_per_minute == 0 {
                DEFAULT_CPM
            } else {
                chars_per_minute
            },
            deadline: None,
        }
    }

    /// Pacing delay for one line: `ceil(length / cpm * 60000)` milliseconds.
    pub fn pacing_delay(&self, line: &str) -> Duration {
        let chars = line.chars().count() as u64;
        Duration::from_millis((chars * 60_000).div_ceil(u64::from(self.cpm)))
    }

    /// Append a line. Arms the release deadline only when none is pending,
    /// so total wait for the k-th item is the sum of the first k delays.
    pub fn push(&mut self, line: String, now: Instant) {
        self.items.push_back(line);
        if self.deadline.is_none() {
            if let Some(head) = self.items.front() {
                self.deadline = Some(now + self.pacing_delay(head));
            }
        }
    }

    /// The armed release deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The armed deadline fired: release the head and re-arm for the new
    /// head, or disarm when the queue has drained.
    pub fn release(&mut self, now: Instant) -> Option<String> {
        let line = self.items.pop_front()?;
        self.deadline = self.items.front().map(|next| now + self.pacing_delay(next));
        Some(line)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
