use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::client::session::GameContext;

/// Global variable tier: name to value.
pub type VarMap = BTreeMap<String, String>;

/// Per-identity variable tier: identity to name-to-value map.
pub type UserVarMap = BTreeMap<String, VarMap>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load brain directory {dir}: {message}")]
    Load { dir: String, message: String },
    #[error("no reply matched")]
    NoReply,
    #[error("engine internal error: {0}")]
    Internal(String),
}

/// External pattern-matching dialogue engine, specified at its boundary only.
/// Matching internals and knowledge-base compilation are the engine's own
/// business; the bot needs loading, replying, and the variable import/export
/// seam that makes learned state survive reloads.
pub trait DialogueEngine: Send {
    /// Load one knowledge-base tier. The global tier and the identity
    /// overlay are loaded as separate calls.
    fn load_directory(&mut self, dir: &Path) -> Result<(), EngineError>;

    /// Called after each tier loads so the engine can sort its replies.
    fn finalize(&mut self);

    /// Match plain text for one identity against the knowledge base. `Err`
    /// is the internal-error marker; such replies are discarded upstream.
    fn reply(
        &mut self,
        identity: &str,
        text: &str,
        context: &GameContext,
    ) -> Result<String, EngineError>;

    fn set_variable(&mut self, name: &str, value: &str);
    fn variables(&self) -> VarMap;
    fn set_user_variables(&mut self, identity: &str, vars: VarMap);
    fn user_variables(&self) -> UserVarMap;
}

/// One fully loaded engine instance plus its knowledge-base version. Exactly
/// one generation is live at a time; replacement is a whole-value swap that
/// only happens after the next generation finished loading.
pub struct BrainGeneration {
    pub seq: u64,
    pub engine: Box<dyn DialogueEngine>,
}
