use std::fs;
use std::io;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::engine::{UserVarMap, VarMap};

pub const BOT_VARS_FILE: &str = "botvars.json";
pub const USER_VARS_FILE: &str = "uservars.json";

/// Learned engine state persisted across restarts and brain reloads: the
/// global variable map plus the per-identity variable maps. Always saved and
/// restored as a pair with an engine generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSet {
    pub global: VarMap,
    pub per_user: UserVarMap,
}

/// Synchronous load/save of a [`VariableSet`] under a per-character prefix
/// directory. Saves are whole-document replacements; loads tolerate missing
/// or corrupt files and fall back to empty defaults.
#[derive(Debug, Clone)]
pub struct VariableStore {
    prefix: PathBuf,
}

impl VariableStore {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &PathBuf {
        &self.prefix
    }

    /// Write both documents, creating the prefix directory on first save.
    pub fn save(&self, vars: &VariableSet) -> io::Result<()> {
        fs::create_dir_all(&self.prefix)?;
        self.write_doc(BOT_VARS_FILE, &vars.global)?;
        self.write_doc(USER_VARS_FILE, &vars.per_user)?;
        debug!(prefix = %self.prefix.display(), "variables saved");
        Ok(())
    }

    /// Read both documents. A file that is absent or unparsable yields an
    /// empty default for that document with a warning; never fatal.
    pub fn load(&self) -> VariableSet {
        VariableSet {
            global: self.read_doc(BOT_VARS_FILE),
            per_user: self.read_doc(USER_VARS_FILE),
        }
    }

    fn write_doc<T: Serialize>(&self, file: &str, value: &T) -> io::Result<()> {
        let mut contents = serde_json::to_string_pretty(value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        contents.push('\n');
        fs::write(self.prefix.join(file), contents)
    }

    fn read_doc<T: DeserializeOwned + Default>(&self, file: &str) -> T {
        let path = self.prefix.join(file);
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(value) => value,
                Err(error) => {
                    warn!(file = %path.display(), %error, "variables could not be parsed, starting empty");
                    T::default()
                }
            },
            Err(error) => {
                warn!(file = %path.display(), %error, "variables could not be read, starting empty");
                T::default()
            }
        }
    }
}
