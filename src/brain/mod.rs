//! The knowledge-base side of the bot: the dialogue-engine boundary, the
//! persisted variable store, and the live-reload coordinator.

pub mod engine;
pub mod reload;
pub mod rules;
pub mod vars;

pub use engine::{BrainGeneration, DialogueEngine, EngineError};
pub use reload::BrainReloadCoordinator;
pub use vars::{VariableSet, VariableStore};
