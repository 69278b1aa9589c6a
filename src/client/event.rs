use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::oneshot;

/// Events delivered by the transport adapter, in arrival order. Lifecycle
/// events come from the transport itself, the rest are protocol-level.
#[derive(Debug)]
pub enum TransportEvent {
    Connect,
    Connecting,
    Disconnect,
    ConnectTimeout,
    ConnectError,
    Error,
    Reconnect,
    Reconnecting,
    ReconnectFailed,
    Output(ServerMessage),
    SetPrompt(String),
    RequestInput(InputRequest),
    Login,
    Logout,
    Playing,
    Quit,
}

/// Server output: either a plain display line or a structured payload
/// carrying context fields (room, inventory, contents, players, ...) and
/// optionally a `text` field.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    Text(String),
    Structured(Map<String, Value>),
}

/// One named field the server wants answered, optionally constrained to an
/// enumerated set of valid values.
#[derive(Debug, Clone, Deserialize)]
pub struct InputField {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// A server request for one or more named fields, answered through the
/// respond channel.
#[derive(Debug)]
pub struct InputRequest {
    pub fields: Vec<InputField>,
    pub respond: oneshot::Sender<HashMap<String, String>>,
}

/// Outbound actions toward the transport: a single "input" line, or closing
/// the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    Input(String),
    Close,
}
