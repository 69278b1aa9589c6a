use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};

use crate::brain::reload::{BrainChange, BrainReloadCoordinator};
use crate::client::event::{ClientAction, ServerMessage, TransportEvent};
use crate::client::session::{ExitReason, Session, SessionAction, SessionState};
use crate::config::BotConfig;
use crate::conversation::ConversationFramer;
use crate::pacing::{DelayedReplyQueue, InactivityWatchdog};

/// Typed termination result handed back to main, which alone performs the
/// actual process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termination {
    pub reason: ExitReason,
}

/// The bot's single consumer loop. Transport events, brain-change events,
/// the pacing deadline and the idle deadline all land here and are handled
/// in arrival order; every piece of mutable state (session, live engine
/// generation, queue, watchdog) is owned by this loop and touched nowhere
/// else.
pub struct Reactor {
    pub events: mpsc::Receiver<TransportEvent>,
    pub actions: mpsc::Sender<ClientAction>,
    pub session: Session,
    pub framer: ConversationFramer,
    pub queue: DelayedReplyQueue,
    pub watchdog: InactivityWatchdog,
    pub brain: BrainReloadCoordinator,
    watch_rx: mpsc::Receiver<BrainChange>,
}

impl Reactor {
    pub fn new(
        config: &BotConfig,
        events: mpsc::Receiver<TransportEvent>,
        actions: mpsc::Sender<ClientAction>,
        brain: BrainReloadCoordinator,
        watch_rx: mpsc::Receiver<BrainChange>,
    ) -> Self {
        Self {
            events,
            actions,
            session: Session::new(config.clone()),
            framer: ConversationFramer::new(),
            queue: DelayedReplyQueue::new(config.speed_cpm),
            watchdog: InactivityWatchdog::new(config.inactivity_ms),
            brain,
            watch_rx,
        }
    }

    pub async fn run(&mut self) -> Termination {
        loop {
            let queue_deadline = self.queue.deadline();
            let watchdog_deadline = self.watchdog.deadline();

            tokio::select! {
                maybe_event = self.events.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if let Some(termination) = self.on_transport_event(event).await {
                                return termination;
                            }
                        }
                        None => {
                            // Transport channel closed underneath us; treat
                            // it like an externally ended session.
                            warn!("transport event channel closed");
                            return self.shutdown(ExitReason::KickedOut).await;
                        }
                    }
                }
                Some(change) = self.watch_rx.recv() => {
                    debug!(path = ?change.path, "brain changed, reloading");
                    self.brain.reload();
                }
                _ = sleep_until(queue_deadline.unwrap_or_else(Instant::now)),
                    if queue_deadline.is_some() =>
                {
                    self.on_queue_deadline().await;
                }
                _ = sleep_until(watchdog_deadline.unwrap_or_else(Instant::now)),
                    if watchdog_deadline.is_some() =>
                {
                    trace!("inactivity timeout");
                    let ping = self.watchdog.fire().to_string();
                    let event = TransportEvent::Output(ServerMessage::Text(ping));
                    if let Some(termination) = self.on_transport_event(event).await {
                        return termination;
                    }
                }
            }
        }
    }

    /// One transport event through the state machine, interpreting the
    /// actions it emits. Public so tests can drive the reactor step by step.
    pub async fn on_transport_event(&mut self, event: TransportEvent) -> Option<Termination> {
        for action in self.session.handle(event) {
            match action {
                SessionAction::Send(line) => self.send(line).await,
                SessionAction::SetPrompt(prompt) => {
                    self.brain.engine().set_variable("name", &prompt);
                }
                SessionAction::Converse(text) => self.converse(&text).await,
                SessionAction::Shutdown(reason) => return Some(self.shutdown(reason).await),
            }
        }
        None
    }

    async fn converse(&mut self, text: &str) {
        let context = self.session.context();
        let dispatch = self.framer.process(text, self.brain.engine(), &context);

        if dispatch.self_quit {
            // Attribute the coming logout to ourselves before anything is
            // actually sent.
            self.session.self_initiated_quit = true;
        }

        let now = Instant::now();
        for outbound in dispatch.lines {
            if outbound.paced {
                self.queue.push(outbound.line, now);
                self.watchdog.on_queued();
            } else {
                self.send(outbound.line).await;
            }
        }
    }

    async fn on_queue_deadline(&mut self) {
        let now = Instant::now();
        if let Some(line) = self.queue.release(now) {
            self.send(line).await;
        }
        if self.queue.is_empty() {
            self.watchdog.on_empty(now);
        }
    }

    async fn send(&mut self, line: String) {
        trace!(%line, "input");
        if self.actions.send(ClientAction::Input(line)).await.is_err() {
            debug!("transport action channel closed");
        }
    }

    /// Shutdown sequence: close the transport, persist learned state, then
    /// hand the typed termination result up.
    async fn shutdown(&mut self, reason: ExitReason) -> Termination {
        let _ = self.actions.send(ClientAction::Close).await;
        self.brain.persist();
        self.session.state = SessionState::Terminal;
        Termination { reason }
    }
}
