//! Chat stream decoding
//!
//! Reasoning models emit a `thinking` segment before the visible answer.
//! [`ChatDecoder`] suppresses that segment, signals it once, and accumulates
//! the visible content in arrival order.
//!
//! ```text
//! Awaiting --thinking--> Thinking --content--> Emitting --done--> Done
//!     \______________________content_____________^
//! any state --done--> Done
//! ```

use crate::errors::Result;
use crate::streaming::parser::StreamChunk;
use crate::types::Role;
use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// Message payload of a chat chunk
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ChunkMessage {
    #[serde(default)]
    pub role: Option<Role>,

    #[serde(default)]
    pub content: Option<String>,

    /// Outer `Some` when the key is present, even as `null`
    #[serde(default, deserialize_with = "present")]
    pub thinking: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// One decoded line of `/api/chat`, or the whole non-streamed reply
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,

    #[serde(default)]
    pub done: bool,
}

/// Non-streamed `/api/chat` reply has the same shape as a chunk
pub type ChatResponse = ChatChunk;

impl ChatChunk {
    /// Visible content carried by this chunk
    pub fn content(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.content.as_deref())
    }

    /// True when this chunk belongs to the reasoning segment
    pub fn is_thinking(&self) -> bool {
        self.message
            .as_ref()
            .map(|m| m.thinking.is_some())
            .unwrap_or(false)
    }
}

impl StreamChunk for ChatChunk {
    fn is_done(&self) -> bool {
        self.done
    }
}

/// Decoder phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    /// No chunk with thinking or content seen yet
    Awaiting,

    /// Model is reasoning; output suppressed
    Thinking,

    /// Visible content is being forwarded
    Emitting,

    /// Terminal chunk processed
    Done,
}

/// Events produced for the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Model entered its reasoning segment (emitted at most once)
    Thinking,

    /// Visible content fragment
    Content(String),

    /// Stream finished; `text` is everything emitted as content
    Done { text: String },
}

/// Four-state chat stream decoder
#[derive(Debug)]
pub struct ChatDecoder {
    phase: ChatPhase,
    text: String,
    thinking_signaled: bool,
    fragments: usize,
}

impl ChatDecoder {
    pub fn new() -> Self {
        Self {
            phase: ChatPhase::Awaiting,
            text: String::new(),
            thinking_signaled: false,
            fragments: 0,
        }
    }

    /// Feed one chunk and collect the events it produces
    pub fn feed(&mut self, chunk: ChatChunk) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        if self.phase == ChatPhase::Done {
            return events;
        }

        if chunk.is_thinking() {
            if self.phase == ChatPhase::Awaiting {
                self.phase = ChatPhase::Thinking;
            }
            if !self.thinking_signaled {
                self.thinking_signaled = true;
                events.push(ChatEvent::Thinking);
            }
        } else if let Some(content) = chunk.content() {
            self.phase = ChatPhase::Emitting;
            if !content.is_empty() {
                self.text.push_str(content);
                self.fragments += 1;
                events.push(ChatEvent::Content(content.to_string()));
            }
        }

        if chunk.done {
            // All output may arrive only in the terminal chunk
            if self.text.is_empty() {
                if let Some(content) = chunk.content().filter(|c| !c.is_empty()) {
                    self.text.push_str(content);
                    events.push(ChatEvent::Content(content.to_string()));
                }
            }

            debug!(
                fragments = self.fragments,
                length = self.text.len(),
                thinking = self.thinking_signaled,
                "chat stream complete"
            );

            self.phase = ChatPhase::Done;
            events.push(ChatEvent::Done {
                text: self.text.clone(),
            });
        }

        events
    }

    /// Current phase
    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    /// Content accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Default for ChatDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a [`ChatDecoder`] over a stream of chat chunks
pub fn chat_events<S>(chunks: S) -> impl Stream<Item = Result<ChatEvent>>
where
    S: Stream<Item = Result<ChatChunk>>,
{
    let mut decoder = ChatDecoder::new();
    chunks.flat_map(move |item| {
        let events: Vec<Result<ChatEvent>> = match item {
            Ok(chunk) => decoder.feed(chunk).into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(events)
    })
}
