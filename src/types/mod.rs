//! Core data model: messages, sessions, usage.

pub mod message;
pub mod session;
pub mod usage;

pub use message::*;
pub use session::*;
pub use usage::*;
