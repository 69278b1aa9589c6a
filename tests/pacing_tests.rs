use roombot::pacing::queue::DelayedReplyQueue;
use roombot::pacing::watchdog::{InactivityWatchdog, IDLE_PING};
use tokio::time::{Duration, Instant};

#[tokio::test(start_paused = true)]
async fn release_delay_matches_formula() {
    let queue = DelayedReplyQueue::new(800);
    // ceil(L / R * 60000): 4 chars at 800 cpm = 300 ms
    assert_eq!(queue.pacing_delay("abcd"), Duration::from_millis(300));
    // 13 chars at 800 cpm = ceil(13 * 75) = 975 ms
    assert_eq!(
        queue.pacing_delay("say hi there!"),
        Duration::from_millis(975)
    );
    // Non-divisible case rounds up: 7 chars at 900 cpm = ceil(466.67) ms
    let faster = DelayedReplyQueue::new(900);
    assert_eq!(faster.pacing_delay("1234567"), Duration::from_millis(467));
}

#[tokio::test(start_paused = true)]
async fn zero_rate_falls_back_to_default() {
    let queue = DelayedReplyQueue::new(0);
    // Default is 800 cpm: one char = 75 ms
    assert_eq!(queue.pacing_delay("x"), Duration::from_millis(75));
}

#[tokio::test(start_paused = true)]
async fn push_arms_deadline_only_when_idle() {
    let mut queue = DelayedReplyQueue::new(800);
    assert!(queue.deadline().is_none());

    let start = Instant::now();
    queue.push("abcd".to_string(), start);
    let armed = queue.deadline().expect("deadline armed on first push");
    assert_eq!(armed, start + Duration::from_millis(300));

    // A second push while a deadline is pending must not re-arm.
    queue.push("abcdefgh".to_string(), start);
    assert_eq!(queue.deadline(), Some(armed));
    assert_eq!(queue.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn items_release_fifo_with_cumulative_delays() {
    let mut queue = DelayedReplyQueue::new(800);
    let start = Instant::now();
    queue.push("abcd".to_string(), start); // 300 ms
    queue.push("abcdefgh".to_string(), start); // 600 ms

    let first_deadline = queue.deadline().expect("armed");
    assert_eq!(first_deadline, start + Duration::from_millis(300));
    assert_eq!(queue.release(first_deadline).as_deref(), Some("abcd"));

    // The second item waits its own full delay after the first release, so
    // it goes out no earlier than the sum of both delays.
    let second_deadline = queue.deadline().expect("re-armed for new head");
    assert_eq!(second_deadline, first_deadline + Duration::from_millis(600));
    assert_eq!(queue.release(second_deadline).as_deref(), Some("abcdefgh"));

    assert!(queue.deadline().is_none());
    assert!(queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn watchdog_arms_on_empty_and_cancels_on_queued() {
    let mut watchdog = InactivityWatchdog::new(10_000);
    assert!(watchdog.deadline().is_none());

    let now = Instant::now();
    watchdog.on_empty(now);
    assert_eq!(watchdog.deadline(), Some(now + Duration::from_millis(10_000)));

    watchdog.on_queued();
    assert!(watchdog.deadline().is_none());

    // Each drain restarts the countdown.
    let later = now + Duration::from_millis(5_000);
    watchdog.on_empty(later);
    assert_eq!(
        watchdog.deadline(),
        Some(later + Duration::from_millis(10_000))
    );

    assert_eq!(watchdog.fire(), IDLE_PING);
    assert!(watchdog.deadline().is_none());
}

#[tokio::test(start_paused = true)]
async fn zero_timeout_disables_watchdog() {
    let mut watchdog = InactivityWatchdog::new(0);
    watchdog.on_empty(Instant::now());
    assert!(watchdog.deadline().is_none());
}
