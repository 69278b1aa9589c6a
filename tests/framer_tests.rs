use std::collections::BTreeMap;
use std::path::Path;

use roombot::brain::engine::{DialogueEngine, EngineError, UserVarMap, VarMap};
use roombot::client::session::GameContext;
use roombot::conversation::{parse_reply, ConversationFramer, Fragment};

/// Engine double that records queries and plays back a canned reply.
#[derive(Default)]
struct StubEngine {
    reply: Option<String>,
    queries: Vec<(String, String)>,
}

impl StubEngine {
    fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            queries: Vec::new(),
        }
    }
}

impl DialogueEngine for StubEngine {
    fn load_directory(&mut self, _dir: &Path) -> Result<(), EngineError> {
        Ok(())
    }

    fn finalize(&mut self) {}

    fn reply(
        &mut self,
        identity: &str,
        text: &str,
        _context: &GameContext,
    ) -> Result<String, EngineError> {
        self.queries.push((identity.to_string(), text.to_string()));
        self.reply.clone().ok_or(EngineError::NoReply)
    }

    fn set_variable(&mut self, _name: &str, _value: &str) {}

    fn variables(&self) -> VarMap {
        BTreeMap::new()
    }

    fn set_user_variables(&mut self, _identity: &str, _vars: VarMap) {}

    fn user_variables(&self) -> UserVarMap {
        BTreeMap::new()
    }
}

#[test]
fn fragments_preserve_source_order() {
    let fragments = parse_reply(r#"[go north]You say "hi" [smile]"#);
    assert_eq!(
        fragments,
        vec![
            Fragment::Command("go north".to_string()),
            Fragment::Utterance(r#"You say "hi""#.to_string()),
            Fragment::Command("smile".to_string()),
        ]
    );
}

#[test]
fn empty_spans_are_dropped() {
    assert_eq!(
        parse_reply("[ ]   [wave]  "),
        vec![Fragment::Command("wave".to_string())]
    );
    assert!(parse_reply("[]").is_empty());
    assert!(parse_reply("   ").is_empty());
}

#[test]
fn plain_reply_is_one_utterance() {
    assert_eq!(
        parse_reply("  Greetings Alice.  "),
        vec![Fragment::Utterance("Greetings Alice.".to_string())]
    );
}

#[test]
fn quoted_utterance_is_decoded_and_queried() {
    let framer = ConversationFramer::new();
    let mut engine = StubEngine::replying("Hello there");
    let context = GameContext::default();

    let dispatch = framer.process(
        "Alice says \"\u{1b}[1mhi\u{1b}[0m\"",
        &mut engine,
        &context,
    );

    assert_eq!(engine.queries, vec![("Alice".to_string(), "hi".to_string())]);
    assert_eq!(dispatch.lines.len(), 1);
    assert_eq!(dispatch.lines[0].line, "say Hello there");
    assert!(dispatch.lines[0].paced);
    assert!(!dispatch.self_quit);
}

#[test]
fn entrance_notice_synthesizes_greeting_query() {
    let framer = ConversationFramer::new();
    let mut engine = StubEngine::replying("Greetings Bob.");
    let context = GameContext::default();

    let dispatch = framer.process("Bob enters.", &mut engine, &context);

    assert_eq!(
        engine.queries,
        vec![("Bob".to_string(), "enters".to_string())]
    );
    assert_eq!(dispatch.lines.len(), 1);
    assert_eq!(dispatch.lines[0].line, "say Greetings Bob.");
}

#[test]
fn dispatch_interleaves_commands_and_utterances_in_order() {
    let framer = ConversationFramer::new();
    let mut engine = StubEngine::replying(r#"[go north]You say "hi" [smile]"#);
    let context = GameContext::default();

    let dispatch = framer.process(r#"Alice says "where to?""#, &mut engine, &context);

    let lines: Vec<(&str, bool)> = dispatch
        .lines
        .iter()
        .map(|out| (out.line.as_str(), out.paced))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("go north", false),
            (r#"say You say "hi""#, true),
            ("smile", false),
        ]
    );
}

#[test]
fn engine_error_discards_reply() {
    let framer = ConversationFramer::new();
    let mut engine = StubEngine::default();
    let context = GameContext::default();

    let dispatch = framer.process(r#"Alice says "hi""#, &mut engine, &context);

    assert_eq!(engine.queries.len(), 1);
    assert!(dispatch.lines.is_empty());
}

#[test]
fn unrecognized_message_never_reaches_engine() {
    let framer = ConversationFramer::new();
    let mut engine = StubEngine::replying("should not be used");
    let context = GameContext::default();

    let dispatch = framer.process("The wind howls outside.", &mut engine, &context);

    assert!(engine.queries.is_empty());
    assert!(dispatch.lines.is_empty());
}

#[test]
fn quit_directive_is_detected_before_dispatch() {
    let framer = ConversationFramer::new();
    let mut engine = StubEngine::replying("Farewell![quit]");
    let context = GameContext::default();

    let dispatch = framer.process(r#"Alice says "bye""#, &mut engine, &context);

    assert!(dispatch.self_quit);
    assert_eq!(dispatch.lines.len(), 2);
    assert_eq!(dispatch.lines[1].line, "quit");
    assert!(!dispatch.lines[1].paced);
}

#[test]
fn quit_prefixed_utterance_also_counts() {
    let framer = ConversationFramer::new();
    let mut engine = StubEngine::replying("quitting while ahead");
    let context = GameContext::default();

    let dispatch = framer.process(r#"Alice says "leaving?""#, &mut engine, &context);

    assert!(dispatch.self_quit);
}
