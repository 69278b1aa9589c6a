use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::pacing::queue::DEFAULT_CPM;
use crate::pacing::watchdog::DEFAULT_INACTIVITY_MS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// Environment configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub username: String,
    pub password: String,
    pub character: String,
    pub selection: String,
    pub address: String,
    pub port: u16,
    pub log_level: String,
    /// Pacing rate in characters per minute.
    pub speed_cpm: u32,
    /// Idle ping after this much silence; zero disables the watchdog.
    pub inactivity_ms: u64,
    pub data_dir: PathBuf,
    pub brain_dir: PathBuf,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            username: required("BOT_USER")?,
            password: required("BOT_PASSWORD")?,
            character: required("BOT_CHARACTER")?,
            // First character slot; the game engine offers no stable way to
            // select a character by name yet.
            selection: "1".to_string(),
            address: optional("ADDRESS", "127.0.0.1"),
            port: parsed("PORT", 8888)?,
            log_level: optional("LOG_LEVEL", "info"),
            speed_cpm: parsed("BOT_SPEED", DEFAULT_CPM)?,
            inactivity_ms: parsed("BOT_INACTIVITY_MS", DEFAULT_INACTIVITY_MS)?,
            data_dir: PathBuf::from(optional("BOT_DATA_DIR", "bot-data")),
            brain_dir: PathBuf::from(optional("BRAIN_DIR", "brain")),
        })
    }

    /// Per-character data directory holding the variable documents and the
    /// identity brain overlay.
    pub fn prefix(&self) -> PathBuf {
        self.data_dir.join(self.character.to_lowercase())
    }

    pub fn overlay_brain_dir(&self) -> PathBuf {
        self.prefix().join("brain")
    }

    /// Configuration lookup for server input requests, keyed by the field
    /// name or label the server sent.
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            "username" | "user" => Some(&self.username),
            "password" => Some(&self.password),
            "character" => Some(&self.character),
            "selection" => Some(&self.selection),
            _ => None,
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid(name, value)),
        Err(_) => Ok(default),
    }
}
