//! Chat sessions on top of the agent loop.

pub mod session;

pub use session::{ChatSession, DisplayEntry, SessionHandle, SessionManager, GREETING};
