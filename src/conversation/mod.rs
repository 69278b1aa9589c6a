//! Inbound message framing and dialogue-engine reply dispatch.

pub mod fragment;
pub mod framer;

pub use fragment::{parse_reply, Fragment};
pub use framer::{ConversationFramer, Dispatch, OutboundLine};

use std::sync::OnceLock;

use regex::Regex;

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[@-~]").expect("ansi pattern"))
}

/// Remove ANSI display-formatting codes, leaving plain text.
pub fn strip_ansi(text: &str) -> String {
    ansi_re().replace_all(text, "").into_owned()
}
