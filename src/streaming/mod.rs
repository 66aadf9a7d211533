//! Streaming client module
//!
//! Provides the Ollama API client, the newline-delimited JSON decoder and
//! the chat thinking/content state machine.

pub mod chat;
pub mod client;
pub mod parser;

// Re-export commonly used types
pub use chat::{chat_events, ChatChunk, ChatDecoder, ChatEvent, ChatPhase, ChatResponse, ChunkMessage};
pub use client::{
    collect_generate, GenerateChunk, GenerateResponse, GenerationOptions, OllamaClient, Timeouts, DEFAULT_OLLAMA_URL,
};
pub use parser::{decode_stream, LineDecoder, StreamChunk, MAX_BUFFER_SIZE};
