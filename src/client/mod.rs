//! The server-facing side of the bot: transport events and actions, the
//! session lifecycle state machine, and the transport channel contract.

pub mod event;
pub mod session;
pub mod transport;

pub use event::{ClientAction, ServerMessage, TransportEvent};
pub use session::{ExitReason, Session, SessionAction, SessionState};
