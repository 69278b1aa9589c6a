use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use super::event::{InputRequest, ServerMessage, TransportEvent};
use crate::config::BotConfig;
use crate::conversation::strip_ansi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Connected,
    Authenticated,
    Playing,
    Disconnected,
    Terminal,
}

/// Why the session ended. Internal components only signal intent; the
/// top-level controller performs the actual process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The bot issued the quit directive itself.
    SelfQuit,
    /// Logged out by an external actor, e.g. the same character signed in
    /// elsewhere. Learned state from this session may be lost.
    KickedOut,
    /// The server rejected the credentials or character before play.
    InvalidCredentials,
    /// A constrained input field's configured value was not among the
    /// allowed options.
    BadFieldConfig,
    /// The global knowledge-base tier failed its initial load.
    BrainLoadFailed,
}

impl ExitReason {
    pub fn status_code(self) -> i32 {
        match self {
            ExitReason::SelfQuit => 0,
            _ => 2,
        }
    }
}

/// What the state machine wants done in response to one transport event,
/// in order. The reactor interprets these; the session never performs I/O
/// or terminates the process itself.
#[derive(Debug)]
pub enum SessionAction {
    /// Emit one outbound input line (protocol directive).
    Send(String),
    /// Hand a playing-state message to the conversation pipeline.
    Converse(String),
    /// Forward the prompt string to the live engine.
    SetPrompt(String),
    /// Close the transport, persist state, and terminate with this reason.
    Shutdown(ExitReason),
}

/// Immutable snapshot of server-pushed context fields. Each structured
/// update produces a new snapshot by shallow merge; consumers holding an old
/// `Arc` keep reading a consistent view.
#[derive(Debug, Clone, Default)]
pub struct GameContext {
    fields: Map<String, Value>,
}

impl GameContext {
    pub fn merged(&self, update: &Map<String, Value>) -> GameContext {
        let mut fields = self.fields.clone();
        for (key, value) in update {
            fields.insert(key.clone(), value.clone());
        }
        GameContext { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn room(&self) -> Option<&str> {
        self.fields.get("room").and_then(Value::as_str)
    }

    pub fn inventory(&self) -> Vec<&str> {
        self.string_list("inventory")
    }

    pub fn contents(&self) -> Vec<&str> {
        self.string_list("contents")
    }

    /// Player names, whether pushed as plain strings or `{ "name": ... }`
    /// objects.
    pub fn players(&self) -> Vec<&str> {
        self.fields
            .get("players")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        item.as_str()
                            .or_else(|| item.get("name").and_then(Value::as_str))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn string_list(&self, key: &str) -> Vec<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

fn rejection_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("Invalid|You have no character").expect("rejection pattern"))
}

/// The session lifecycle state machine. Owns connection/authentication/play
/// state and the context snapshot; reacts to transport events with ordered
/// [`SessionAction`]s.
pub struct Session {
    pub state: SessionState,
    pub self_initiated_quit: bool,
    context: Arc<GameContext>,
    config: BotConfig,
}

impl Session {
    pub fn new(config: BotConfig) -> Self {
        Self {
            state: SessionState::Unauthenticated,
            self_initiated_quit: false,
            context: Arc::new(GameContext::default()),
            config,
        }
    }

    /// The current context snapshot.
    pub fn context(&self) -> Arc<GameContext> {
        Arc::clone(&self.context)
    }

    pub fn handle(&mut self, event: TransportEvent) -> Vec<SessionAction> {
        match event {
            TransportEvent::Connect => {
                debug!("connected");
                self.state = SessionState::Connected;
                vec![SessionAction::Send("login".to_string())]
            }
            TransportEvent::Connecting => {
                debug!("connecting");
                vec![]
            }
            TransportEvent::Disconnect | TransportEvent::Reconnecting => {
                debug!("disconnected");
                self.state = SessionState::Disconnected;
                vec![]
            }
            // The server resumes the session; nothing is re-emitted.
            TransportEvent::Reconnect => {
                debug!("reconnected");
                self.state = SessionState::Connected;
                vec![]
            }
            TransportEvent::ConnectTimeout
            | TransportEvent::ConnectError
            | TransportEvent::Error
            | TransportEvent::ReconnectFailed => {
                debug!("transport fault");
                vec![]
            }
            TransportEvent::Login => {
                debug!("login");
                self.state = SessionState::Authenticated;
                vec![SessionAction::Send("play".to_string())]
            }
            TransportEvent::Playing => {
                info!("playing");
                self.state = SessionState::Playing;
                vec![]
            }
            TransportEvent::Logout => {
                debug!("logout");
                self.state = SessionState::Connected;
                if self.self_initiated_quit {
                    info!("exit (requested by bot)");
                    vec![SessionAction::Shutdown(ExitReason::SelfQuit)]
                } else {
                    // Kicked out from another session. That session may have
                    // loaded our variables; there is no cross-session watch,
                    // so the state we persist here can be overwritten.
                    error!("exit (kicked out)");
                    vec![SessionAction::Shutdown(ExitReason::KickedOut)]
                }
            }
            TransportEvent::Quit => {
                debug!("quit");
                self.state = SessionState::Authenticated;
                vec![SessionAction::Send("logout".to_string())]
            }
            TransportEvent::SetPrompt(prompt) => {
                debug!(%prompt, "set-prompt");
                vec![SessionAction::SetPrompt(prompt)]
            }
            TransportEvent::RequestInput(request) => self.answer_input_request(request),
            TransportEvent::Output(message) => self.handle_output(message),
        }
    }

    fn handle_output(&mut self, message: ServerMessage) -> Vec<SessionAction> {
        let text = match message {
            ServerMessage::Text(text) => Some(text),
            ServerMessage::Structured(map) => {
                debug!("context updated");
                self.context = Arc::new(self.context.merged(&map));
                map.get("text").and_then(Value::as_str).map(str::to_owned)
            }
        };
        let Some(text) = text else {
            return vec![];
        };

        if self.state == SessionState::Playing {
            vec![SessionAction::Converse(text)]
        } else if rejection_re().is_match(&text) {
            // Rejection at login or play is not conversational input.
            error!(message = %strip_ansi(&text), "invalid credentials");
            vec![SessionAction::Shutdown(ExitReason::InvalidCredentials)]
        } else {
            vec![]
        }
    }

    /// Answer a server field request from configuration. A constrained field
    /// whose configured value is not among the allowed options is fatal
    /// misconfiguration.
    fn answer_input_request(&mut self, request: InputRequest) -> Vec<SessionAction> {
        let mut response = HashMap::new();
        for field in &request.fields {
            if let Some(options) = &field.options {
                let key = field.label.as_deref().unwrap_or(&field.name);
                match self.config.field(key) {
                    Some(value) if options.iter().any(|option| option == value) => {
                        response.insert(field.name.clone(), value.to_string());
                    }
                    _ => {
                        error!(field = %field.name, "configured value not among allowed options");
                        return vec![SessionAction::Shutdown(ExitReason::BadFieldConfig)];
                    }
                }
            } else if let Some(value) = self.config.field(&field.name) {
                response.insert(field.name.clone(), value.to_string());
            }
        }
        if request.respond.send(response).is_err() {
            debug!("input request respondent gone");
        }
        vec![]
    }
}
