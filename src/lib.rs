pub mod brain;
pub mod client;
pub mod config;
pub mod conversation;
pub mod pacing;
pub mod reactor;

pub use reactor::{Reactor, Termination};
