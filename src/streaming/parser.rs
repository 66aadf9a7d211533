//! Newline-delimited JSON decoding for streaming responses
//!
//! Ollama streams one JSON object per line. Network chunks do not respect
//! line boundaries, so bytes are buffered until a `\n` arrives:
//! - Buffer: 1MB maximum for a single unfinished line
//! - Malformed lines are skipped, never fatal
//! - The stream ends right after the chunk flagged `done`

use crate::errors::{ClientError, Result};
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Maximum size of one unfinished line (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// A decoded line of a streamed response
pub trait StreamChunk: DeserializeOwned {
    /// True for the terminal chunk of the stream
    fn is_done(&self) -> bool;
}

/// Incremental line splitter and decoder
#[derive(Debug)]
pub struct LineDecoder {
    /// Bytes of the current unfinished line
    buffer: Vec<u8>,

    /// Maximum buffer size
    max_buffer_size: usize,

    /// Lines dropped because they were not valid JSON
    skipped: usize,
}

impl LineDecoder {
    /// Create new decoder with default settings
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    /// Create decoder with custom buffer capacity
    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_buffer_size,
            skipped: 0,
        }
    }

    /// Add bytes and return every line they complete
    ///
    /// Blank lines are dropped. A trailing `\r` is stripped so CRLF
    /// framing decodes the same as LF.
    pub fn add_bytes(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(line) = Self::clean_line(&raw[..raw.len() - 1]) {
                lines.push(line);
            }
        }

        if self.buffer.len() > self.max_buffer_size {
            let size = self.buffer.len();
            self.buffer.clear();
            return Err(ClientError::Decode(format!(
                "Line of {} bytes exceeds maximum {}",
                size, self.max_buffer_size
            )));
        }

        Ok(lines)
    }

    /// Flush the final line when the body ends without a newline
    pub fn finish(&mut self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        Self::clean_line(&raw)
    }

    /// Decode one line, skipping it when it is not valid JSON for `T`
    pub fn decode<T: DeserializeOwned>(&mut self, line: &str) -> Option<T> {
        match serde_json::from_str(line) {
            Ok(value) => Some(value),
            Err(e) => {
                self.skipped += 1;
                warn!(error = %e, line, "skipping malformed stream line");
                None
            }
        }
    }

    /// Number of lines skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Get current buffer size
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn clean_line(raw: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(raw);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

struct DecodeState<S, T> {
    bytes: S,
    decoder: LineDecoder,
    pending: VecDeque<Result<T>>,
    finished: bool,
}

impl<S, T: StreamChunk> DecodeState<S, T> {
    fn queue(&mut self, lines: Vec<String>) {
        for line in lines {
            if let Some(chunk) = self.decoder.decode::<T>(&line) {
                self.pending.push_back(Ok(chunk));
            }
        }
    }
}

/// Turn a body byte stream into a lazy stream of decoded chunks
///
/// The returned stream is finite and cannot be restarted: it ends after
/// the first `done` chunk, at end of body, or after the first transport
/// error (which is yielded once).
pub fn decode_stream<S, T>(bytes: S) -> impl Stream<Item = Result<T>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
    T: StreamChunk,
{
    let state: DecodeState<S, T> = DecodeState {
        bytes,
        decoder: LineDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if matches!(&item, Ok(chunk) if chunk.is_done()) {
                    state.finished = true;
                    state.pending.clear();
                }
                return Some((item, state));
            }

            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(bytes)) => match state.decoder.add_bytes(&bytes) {
                    Ok(lines) => state.queue(lines),
                    Err(e) => {
                        state.finished = true;
                        state.pending.push_back(Err(e));
                    }
                },
                Some(Err(e)) => {
                    state.finished = true;
                    state.pending.push_back(Err(e));
                }
                None => {
                    state.finished = true;
                    debug!(
                        trailing_bytes = state.decoder.buffer_size(),
                        skipped = state.decoder.skipped(),
                        "stream body ended"
                    );
                    if let Some(line) = state.decoder.finish() {
                        state.queue(vec![line]);
                    }
                }
            }
        }
    })
}
