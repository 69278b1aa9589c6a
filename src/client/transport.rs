//! Transport channel contract plus a JSON-lines stdio adapter. The reactor
//! only ever sees the duplex channel pair; the wire protocol, reconnection
//! algorithm, and delivery guarantees belong to the adapter behind it. The
//! stdio adapter gives the binary a concrete already-connected channel: one
//! JSON event per stdin line, one JSON action per stdout line.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::event::{ClientAction, InputField, InputRequest, ServerMessage, TransportEvent};

/// The duplex channel pair an adapter hands to the reactor.
pub struct TransportChannels {
    pub events: mpsc::Receiver<TransportEvent>,
    pub actions: mpsc::Sender<ClientAction>,
}

/// One stdin line decodes to one transport event.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum WireEvent {
    Connect,
    Connecting,
    Disconnect,
    ConnectTimeout,
    ConnectError,
    Error,
    Reconnect,
    Reconnecting,
    ReconnectFailed,
    Output { message: Value },
    SetPrompt { prompt: String },
    RequestInput { fields: Vec<InputField> },
    Login,
    Logout,
    Playing,
    Quit,
}

/// Spawn the stdio adapter tasks and return the reactor's channel pair.
pub fn spawn_stdio_transport() -> TransportChannels {
    let (event_tx, event_rx) = mpsc::channel(64);
    let (action_tx, mut action_rx) = mpsc::channel::<ClientAction>(64);
    let (out_tx, mut out_rx) = mpsc::channel::<String>(64);

    // Single writer task owns stdout; actions and input-request responses
    // both funnel through it.
    tokio::spawn(async move {
        let mut stdout = stdout();
        while let Some(line) = out_rx.recv().await {
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            let _ = stdout.write_all(b"\n").await;
            let _ = stdout.flush().await;
        }
    });

    let wire_tx = out_tx.clone();
    tokio::spawn(async move {
        while let Some(action) = action_rx.recv().await {
            match action {
                ClientAction::Input(line) => {
                    let payload = json!({ "input": line }).to_string();
                    if wire_tx.send(payload).await.is_err() {
                        break;
                    }
                }
                ClientAction::Close => break,
            }
        }
        debug!("transport closed");
    });

    tokio::spawn(async move {
        let mut lines = BufReader::new(stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<WireEvent>(line) {
                        Ok(wire) => {
                            let event = decode(wire, &out_tx);
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(error) => warn!(%error, "unrecognized transport line"),
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }
        debug!("transport reader finished");
    });

    TransportChannels {
        events: event_rx,
        actions: action_tx,
    }
}

fn decode(wire: WireEvent, out_tx: &mpsc::Sender<String>) -> TransportEvent {
    match wire {
        WireEvent::Connect => TransportEvent::Connect,
        WireEvent::Connecting => TransportEvent::Connecting,
        WireEvent::Disconnect => TransportEvent::Disconnect,
        WireEvent::ConnectTimeout => TransportEvent::ConnectTimeout,
        WireEvent::ConnectError => TransportEvent::ConnectError,
        WireEvent::Error => TransportEvent::Error,
        WireEvent::Reconnect => TransportEvent::Reconnect,
        WireEvent::Reconnecting => TransportEvent::Reconnecting,
        WireEvent::ReconnectFailed => TransportEvent::ReconnectFailed,
        WireEvent::Output { message } => TransportEvent::Output(match message {
            Value::String(text) => ServerMessage::Text(text),
            Value::Object(map) => ServerMessage::Structured(map),
            other => ServerMessage::Text(other.to_string()),
        }),
        WireEvent::SetPrompt { prompt } => TransportEvent::SetPrompt(prompt),
        WireEvent::RequestInput { fields } => {
            let (respond, response_rx) = oneshot::channel::<HashMap<String, String>>();
            let out = out_tx.clone();
            tokio::spawn(async move {
                if let Ok(response) = response_rx.await {
                    let payload = json!({ "response": response }).to_string();
                    let _ = out.send(payload).await;
                }
            });
            TransportEvent::RequestInput(InputRequest { fields, respond })
        }
        WireEvent::Login => TransportEvent::Login,
        WireEvent::Logout => TransportEvent::Logout,
        WireEvent::Playing => TransportEvent::Playing,
        WireEvent::Quit => TransportEvent::Quit,
    }
}
