//! Error types for ollamachat
//!
//! Every network and decode failure is classified at the client boundary so
//! callers can turn it into a readable message instead of a fault.

use thiserror::Error;

/// Remediation hint shown when the server cannot be reached
pub const START_HINT: &str = "ollama serve";

/// Main error type for the Ollama client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection refused or DNS/connect failure
    #[error("Cannot connect to Ollama at {url}. Please ensure Ollama is running ({hint})", hint = START_HINT)]
    Unreachable { url: String },

    /// Connect or request deadline exceeded
    #[error("Request timed out. The model may be processing a long response. Try reducing max tokens or disabling streaming.")]
    Timeout,

    /// Server answered with a non-success status
    #[error("Ollama API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport failure after the response started streaming
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Response body did not match the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Other HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Classify a reqwest error raised while talking to `url`
    pub fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::Unreachable {
                url: url.to_string(),
            }
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Http(err)
        }
    }

    /// Classify a reqwest error raised while reading a streamed body
    pub fn from_stream(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Stream(err.to_string())
        }
    }

    /// True when the server could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Unreachable { .. })
    }

    /// True for connect or request deadlines
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout)
    }

    /// Text appended to a partially streamed answer when the stream breaks
    pub fn truncation_notice(&self) -> String {
        match self {
            ClientError::Timeout => "\n\n[Response truncated due to timeout. Try reducing max tokens or disabling streaming.]".to_string(),
            ClientError::Stream(msg) => format!("\n\n[Streaming error: {}]", msg),
            other => format!("\n\n[Streaming error: {}]", other),
        }
    }

    /// Display string used in place of an assistant answer
    pub fn display_message(&self) -> String {
        format!("Error: {}", self)
    }
}
