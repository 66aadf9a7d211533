//! ollamachat - Client for a local Ollama server
//!
//! Talks to the Ollama HTTP API (model listing, generation, chat and the
//! OpenAI-compatible endpoint), decodes streamed newline-delimited JSON
//! and drives an interactive terminal chat on top of it.
//!
//! # Architecture
//!
//! - **streaming**: HTTP client, line decoder, chat thinking/content decoder
//! - **models**: model listing types and selection
//! - **repl**: interactive chat session, commands and rendering
//! - **demo**: fixed walkthrough of every endpoint
//! - **cli**: arguments, TOML configuration and logging

pub mod errors;
pub mod types;
pub mod streaming;
pub mod models;

// Re-export commonly used types
pub use errors::{ClientError, Result};
pub use streaming::OllamaClient;
pub use types::{Message, Role};

// Front-ends
pub mod cli;
pub mod demo;
pub mod repl;
pub mod telemetry;
