use std::sync::OnceLock;

use regex::Regex;

/// A parsed piece of a dialogue-engine reply: a bracketed control command or
/// a plain utterance. Commands bypass pacing, utterances do not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Command(String),
    Utterance(String),
}

impl Fragment {
    pub fn text(&self) -> &str {
        match self {
            Fragment::Command(text) | Fragment::Utterance(text) => text,
        }
    }
}

fn span_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]*\]|[^\[\]]+").expect("span pattern"))
}

/// Split a reply into command and utterance fragments, strictly left to
/// right. Brackets are stripped, spans are trimmed, empty spans are dropped.
/// The interleaving of commands and speech is intentional and preserved.
pub fn parse_reply(reply: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    for span in span_re().find_iter(reply) {
        let span = span.as_str();
        if let Some(inner) = span.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let command = inner.trim();
            if !command.is_empty() {
                fragments.push(Fragment::Command(command.to_string()));
            }
        } else {
            let utterance = span.trim();
            if !utterance.is_empty() {
                fragments.push(Fragment::Utterance(utterance.to_string()));
            }
        }
    }
    fragments
}
