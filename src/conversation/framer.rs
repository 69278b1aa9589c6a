use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::fragment::{parse_reply, Fragment};
use super::strip_ansi;
use crate::brain::engine::DialogueEngine;
use crate::client::session::GameContext;

/// An outbound command beginning with this keyword means the bot asked to
/// leave; the following logout must be attributed to the bot itself.
const QUIT_KEYWORD: &str = "quit";

/// One outbound line produced from an engine reply, in source order.
/// Unpaced lines go to the transport immediately; paced ones are queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundLine {
    pub line: String,
    pub paced: bool,
}

/// Everything one inbound message produced: the ordered outbound lines plus
/// whether a quit directive was among them.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub lines: Vec<OutboundLine>,
    pub self_quit: bool,
}

fn enters_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(.*) enters\.").expect("enters pattern"))
}

fn says_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)^(.*) says "(.*)""#).expect("says pattern"))
}

/// Recognizes the two conversational inbound patterns, queries the dialogue
/// engine, and turns its reply into ordered outbound lines.
#[derive(Debug, Default)]
pub struct ConversationFramer;

impl ConversationFramer {
    pub fn new() -> Self {
        Self
    }

    /// Patterns are tested in fixed priority order, first match wins; a
    /// message matching neither is not conversational and produces nothing.
    pub fn process(
        &self,
        message: &str,
        engine: &mut dyn DialogueEngine,
        context: &GameContext,
    ) -> Dispatch {
        let (identity, text) = if let Some(caps) = enters_re().captures(message) {
            // Synthetic utterance so the brain can greet whoever walked in.
            (caps[1].to_string(), "enters".to_string())
        } else if let Some(caps) = says_re().captures(message) {
            (caps[1].to_string(), strip_ansi(&caps[2]))
        } else {
            return Dispatch::default();
        };

        let reply = match engine.reply(&identity, &text, context) {
            Ok(reply) => reply,
            Err(error) => {
                debug!(%identity, %error, "engine produced no usable reply");
                return Dispatch::default();
            }
        };

        let mut dispatch = Dispatch::default();
        for fragment in parse_reply(&reply) {
            if fragment.text().starts_with(QUIT_KEYWORD) {
                dispatch.self_quit = true;
            }
            dispatch.lines.push(match fragment {
                Fragment::Command(command) => OutboundLine {
                    line: command,
                    paced: false,
                },
                Fragment::Utterance(utterance) => OutboundLine {
                    line: format!("say {utterance}"),
                    paced: true,
                },
            });
        }
        dispatch
    }
}
