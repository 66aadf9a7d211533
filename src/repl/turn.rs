//! One chat turn against the server
//!
//! A turn asks the model with the whole transcript plus the new prompt,
//! renders the answer, then appends the user message and exactly one
//! assistant message together. Client failures end up as text in the
//! transcript.

use crate::errors::ClientError;
use crate::repl::display::{elapsed_caption, role_label, DisplayManager, StreamRenderer};
use crate::repl::session::ChatSession;
use crate::streaming::{chat_events, ChatChunk, ChatEvent, OllamaClient};
use crate::types::{Message, Role};
use colored::*;
use futures_util::{pin_mut, Stream, StreamExt};
use indicatif::ProgressBar;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Stored when a non-streamed reply carries no content
pub const NO_CONTENT: &str = "Error: No response";

/// Result of a completed turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Assistant text as stored in the transcript
    pub reply: String,
    pub elapsed: Duration,
    /// The request failed before or during the answer
    pub failed: bool,
}

/// Probe the server and refresh the known model list
///
/// Returns the model switched to when the selected one is not installed.
pub async fn refresh_server(client: &OllamaClient, session: &mut ChatSession) -> Option<String> {
    if !client.is_available().await {
        info!(url = client.base_url(), "ollama not reachable");
        return session.update_server(false, Vec::new());
    }

    match client.list_models().await {
        Ok(models) => session.update_server(true, models),
        Err(e) => {
            warn!(error = %e, "model listing failed");
            session.update_server(true, Vec::new())
        }
    }
}

/// Run one turn, writing the answer to `out`
///
/// Only write failures on `out` are returned; the transcript is left
/// untouched when one cuts the turn short.
pub async fn run_turn<W: Write>(
    client: &OllamaClient,
    session: &mut ChatSession,
    display: &DisplayManager,
    prompt: &str,
    out: &mut W,
) -> io::Result<TurnOutcome> {
    let settings = session.settings().clone();
    let options = settings.generation_options();
    let mut messages = session.messages().to_vec();
    messages.push(Message::user(prompt));
    let start = Instant::now();

    write!(out, "{} ", role_label(Role::Assistant))?;
    out.flush()?;

    let (reply, error) = if settings.streaming {
        match client
            .chat_stream(&settings.model, &messages, &options)
            .await
        {
            Ok(chunks) => stream_reply(chunks, display, out).await?,
            Err(e) => request_failed(e, out)?,
        }
    } else {
        let spinner = display.spinner("Thinking...");
        let result = client
            .chat(&settings.model, &messages, &options)
            .await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => {
                let reply = response
                    .content()
                    .map(str::to_string)
                    .unwrap_or_else(|| NO_CONTENT.to_string());
                writeln!(out, "{}", reply)?;
                (reply, None)
            }
            Err(e) => request_failed(e, out)?,
        }
    };

    if error.as_ref().map_or(false, ClientError::is_unreachable) {
        session.mark_offline();
    }

    let elapsed = start.elapsed();
    session.record_latency(elapsed);
    session.push_user(prompt);
    session.push_assistant(reply.clone());
    writeln!(out, "{}", elapsed_caption(elapsed).dimmed())?;

    info!(
        model = %settings.model,
        elapsed_ms = elapsed.as_millis() as u64,
        chars = reply.len(),
        "turn complete"
    );

    Ok(TurnOutcome {
        reply,
        elapsed,
        failed: error.is_some(),
    })
}

type Reply = (String, Option<ClientError>);

fn request_failed<W: Write>(err: ClientError, out: &mut W) -> io::Result<Reply> {
    let message = err.display_message();
    writeln!(out, "{}", message.red())?;
    Ok((message, Some(err)))
}

/// Render a chat stream; a mid-stream failure keeps the partial text
async fn stream_reply<S, W>(chunks: S, display: &DisplayManager, out: &mut W) -> io::Result<Reply>
where
    S: Stream<Item = crate::errors::Result<ChatChunk>>,
    W: Write,
{
    let events = chat_events(chunks);
    pin_mut!(events);

    let mut renderer = StreamRenderer::new(out);
    let mut spinner: Option<ProgressBar> = None;
    let mut text = String::new();
    let mut error = None;

    while let Some(event) = events.next().await {
        match event {
            Ok(ChatEvent::Thinking) => {
                spinner = Some(display.spinner("🤔 Thinking..."));
            }
            Ok(ChatEvent::Content(fragment)) => {
                if let Some(pb) = spinner.take() {
                    pb.finish_and_clear();
                }
                renderer.push(&fragment)?;
                text.push_str(&fragment);
            }
            Ok(ChatEvent::Done { .. }) => {}
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }

    if let Some(pb) = spinner.take() {
        pb.finish_and_clear();
    }

    if let Some(e) = &error {
        warn!(error = %e, "stream interrupted");
        let notice = e.truncation_notice();
        renderer.push(&notice)?;
        text.push_str(&notice);
    }

    if text.is_empty() {
        renderer.finish_empty()?;
    } else {
        renderer.finish()?;
    }

    Ok((text, error))
}
