//! Fixed API demonstration sequence
//!
//! Walks through listing, generation, chat, streaming and the
//! OpenAI-compatible endpoint. Each step reports its own failure and the
//! sequence always runs to the end.

use crate::errors::ClientError;
use crate::streaming::{GenerationOptions, OllamaClient};
use crate::types::Message;
use colored::*;
use futures_util::{pin_mut, StreamExt};
use std::io::{self, Write};

const GENERATE_PROMPT: &str = "Write a haiku about the sea";
const STREAM_PROMPT: &str = "Tell me a short fact about the Rust programming language";
const COMPAT_TEMPERATURE: f32 = 0.7;
const COMPAT_MAX_TOKENS: u32 = 500;

/// Fixed conversation used by the chat step
pub fn demo_conversation() -> Vec<Message> {
    vec![
        Message::user("What's the weather like in Dubai?"),
        Message::assistant(
            "Dubai typically has a desert climate with hot summers and warm winters. \
             Summer temperatures can exceed 40°C (104°F), while winters are mild around 20-25°C (68-77°F).",
        ),
        Message::user("What's the best time to visit?"),
    ]
}

/// Runs the demonstration against one model
pub struct Demo<'a> {
    client: &'a OllamaClient,
    model: &'a str,
}

impl<'a> Demo<'a> {
    pub fn new(client: &'a OllamaClient, model: &'a str) -> Self {
        Self { client, model }
    }

    /// Run every step, writing to `out`
    ///
    /// Only write failures on `out` are returned; API failures are printed
    /// under the step that hit them.
    pub async fn run<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let rule = "=".repeat(50);
        writeln!(out, "{}", rule.cyan())?;
        writeln!(out, "{}", "Ollama API Example".bold().cyan())?;
        writeln!(out, "  Server: {} | Model: {}", self.client.base_url(), self.model)?;
        writeln!(out, "{}", rule.cyan())?;

        section(out, "1. Available Models:")?;
        if let Err(e) = self.list_models(out).await {
            report(out, "Error listing models", e)?;
        }

        section(out, "2. Simple Generation:")?;
        if let Err(e) = self.simple_generation(out).await {
            report(out, "Error generating response", e)?;
        }

        section(out, "3. Chat Conversation:")?;
        if let Err(e) = self.chat_conversation(out).await {
            report(out, "Error in chat", e)?;
        }

        section(out, "4. Streaming Response:")?;
        if let Err(e) = self.streaming_generation(out).await {
            writeln!(out)?;
            report(out, "Error in streaming", e)?;
        }

        section(out, "5. OpenAI-Compatible Endpoint:")?;
        if let Err(e) = self.openai_compatible(out).await {
            report(out, "Error in OpenAI-compatible chat", e)?;
        }

        writeln!(out, "\n{}", rule.cyan())?;
        out.flush()
    }

    async fn list_models<W: Write>(&self, out: &mut W) -> Result<(), DemoError> {
        let models = self.client.list_models().await?;
        if models.is_empty() {
            writeln!(out, "  (no models installed)")?;
        }
        for model in &models {
            writeln!(out, "  - {}: {}", model.name.green(), model.formatted_size())?;
        }
        Ok(())
    }

    async fn simple_generation<W: Write>(&self, out: &mut W) -> Result<(), DemoError> {
        let response = self
            .client
            .generate(self.model, GENERATE_PROMPT, &GenerationOptions::default())
            .await?;
        writeln!(out, "  {}", or_no_response(&response.response))?;
        Ok(())
    }

    async fn chat_conversation<W: Write>(&self, out: &mut W) -> Result<(), DemoError> {
        let messages = demo_conversation();
        let response = self
            .client
            .chat(self.model, &messages, &GenerationOptions::default())
            .await?;

        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        writeln!(out, "  {} {}", "User:".bold(), last)?;
        writeln!(
            out,
            "  {} {}",
            "Assistant:".bold(),
            or_no_response(response.content().unwrap_or_default())
        )?;
        Ok(())
    }

    async fn streaming_generation<W: Write>(&self, out: &mut W) -> Result<(), DemoError> {
        writeln!(out, "  Prompt: {}", STREAM_PROMPT)?;
        write!(out, "  Response: ")?;
        out.flush()?;

        let chunks = self
            .client
            .generate_stream(self.model, STREAM_PROMPT, &GenerationOptions::default())
            .await?;
        pin_mut!(chunks);

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if chunk.done {
                writeln!(out)?;
            } else {
                write!(out, "{}", chunk.response)?;
                out.flush()?;
            }
        }
        Ok(())
    }

    async fn openai_compatible<W: Write>(&self, out: &mut W) -> Result<(), DemoError> {
        let messages = vec![
            Message::system("You are a helpful assistant."),
            Message::user("Say hello from Dubai!"),
        ];
        let reply = self
            .client
            .openai_chat(self.model, &messages, COMPAT_TEMPERATURE, COMPAT_MAX_TOKENS)
            .await?;
        writeln!(out, "  {}", or_no_response(&reply))?;
        Ok(())
    }
}

/// Failure of a single demo step
#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("output error: {0}")]
    Output(#[from] io::Error),
}

fn section<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out, "\n{}", title.bold())?;
    writeln!(out, "{}", "-".repeat(30))
}

fn report<W: Write>(out: &mut W, context: &str, err: DemoError) -> io::Result<()> {
    match err {
        DemoError::Output(e) => Err(e),
        DemoError::Client(e) => writeln!(out, "  {}: {}", context.red(), e),
    }
}

fn or_no_response(text: &str) -> &str {
    if text.is_empty() {
        "No response"
    } else {
        text
    }
}
