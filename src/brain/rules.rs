//! Minimal reference engine behind the [`DialogueEngine`] trait: `*.brain`
//! files of `trigger => reply` lines, lowercase exact match. It exists so the
//! binary and the reload machinery run end to end; real deployments plug a
//! proper pattern-matching engine into the same trait.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use super::engine::{DialogueEngine, EngineError, UserVarMap, VarMap};
use crate::client::session::GameContext;

#[derive(Debug, Default)]
pub struct RulesEngine {
    rules: Vec<(String, String)>,
    variables: VarMap,
    user_variables: UserVarMap,
}

impl RulesEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn load_error(dir: &Path, message: impl ToString) -> EngineError {
        EngineError::Load {
            dir: dir.display().to_string(),
            message: message.to_string(),
        }
    }
}

impl DialogueEngine for RulesEngine {
    fn load_directory(&mut self, dir: &Path) -> Result<(), EngineError> {
        let entries = fs::read_dir(dir).map_err(|e| Self::load_error(dir, e))?;
        let mut files = 0usize;
        for entry in entries {
            let path = entry.map_err(|e| Self::load_error(dir, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("brain") {
                continue;
            }
            let contents = fs::read_to_string(&path).map_err(|e| Self::load_error(dir, e))?;
            for (lineno, line) in contents.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((trigger, reply)) = line.split_once("=>") else {
                    return Err(Self::load_error(
                        dir,
                        format!(
                            "{}:{}: expected 'trigger => reply'",
                            path.display(),
                            lineno + 1
                        ),
                    ));
                };
                self.rules
                    .push((trigger.trim().to_lowercase(), reply.trim().to_string()));
            }
            files += 1;
        }
        debug!(dir = %dir.display(), files, "brain directory loaded");
        Ok(())
    }

    fn finalize(&mut self) {
        // Later definitions shadow earlier ones, so the identity overlay
        // wins over the global tier for the same trigger.
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(self.rules.len());
        for rule in self.rules.drain(..).rev() {
            if seen.insert(rule.0.clone()) {
                kept.push(rule);
            }
        }
        kept.reverse();
        self.rules = kept;
    }

    fn reply(
        &mut self,
        identity: &str,
        text: &str,
        context: &GameContext,
    ) -> Result<String, EngineError> {
        let needle = text.trim().to_lowercase();
        let reply = self
            .rules
            .iter()
            .find(|(trigger, _)| *trigger == needle)
            .map(|(_, reply)| reply.clone())
            .ok_or(EngineError::NoReply)?;

        self.user_variables
            .entry(identity.to_string())
            .or_default()
            .insert("last_input".to_string(), text.to_string());

        let name = self.variables.get("name").cloned().unwrap_or_default();
        let room = context.room().unwrap_or("somewhere").to_string();
        Ok(reply
            .replace("<user>", identity)
            .replace("<name>", &name)
            .replace("<room>", &room))
    }

    fn set_variable(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
    }

    fn variables(&self) -> VarMap {
        self.variables.clone()
    }

    fn set_user_variables(&mut self, identity: &str, vars: VarMap) {
        self.user_variables.insert(identity.to_string(), vars);
    }

    fn user_variables(&self) -> UserVarMap {
        self.user_variables.clone()
    }
}
