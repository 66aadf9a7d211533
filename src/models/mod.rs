//! Ollama model descriptors
//!
//! Types for the `/api/tags` listing and the model selection rule used by
//! the chat front-end.

pub mod types;

// Re-export key types for convenience
pub use types::{format_gib, select_model, ModelDetails, ModelInfo, ModelsResponse};
