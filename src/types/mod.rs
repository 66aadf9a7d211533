//! Type definitions module
//!
//! Conversation messages shared by the client, the demo and the REPL.

pub mod messages;

// Re-export commonly used types
pub use messages::{Message, Role};
