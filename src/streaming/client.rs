//! Ollama API client
//!
//! Covers the endpoints the demo and the chat front-end need:
//! - GET  /api/tags                 model listing
//! - POST /api/generate             single-turn completion
//! - POST /api/chat                 multi-turn chat
//! - POST /v1/chat/completions      OpenAI-compatible chat
//!
//! Streaming calls return a lazy [`Stream`] of decoded lines. Nothing is
//! retried; every failure is classified into a [`ClientError`].

use crate::errors::{ClientError, Result};
use crate::models::{ModelInfo, ModelsResponse};
use crate::streaming::chat::{ChatChunk, ChatResponse};
use crate::streaming::parser::{decode_stream, StreamChunk};
use crate::types::Message;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Connect timeout (10 seconds)
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-request timeout (5 minutes, long answers stream slowly)
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Status probe timeout (2 seconds)
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// API key the OpenAI-compatible endpoint expects (any value works)
const OPENAI_COMPAT_KEY: &str = "ollama";

/// Timeouts applied by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    /// Whole-reply deadline; for streamed replies, the longest wait for
    /// the response head or between two body reads
    pub request: Duration,
    pub status: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: CONNECT_TIMEOUT,
            request: REQUEST_TIMEOUT,
            status: STATUS_TIMEOUT,
        }
    }
}

/// Optional generation parameters sent with generate and chat requests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature (sent top-level)
    pub temperature: Option<f32>,

    /// Maximum output tokens (`options.num_predict`)
    pub num_predict: Option<u32>,

    /// Context window (`options.num_ctx`)
    pub num_ctx: Option<u32>,

    /// How long the server keeps the model loaded, e.g. "5m"
    pub keep_alive: Option<String>,
}

impl GenerationOptions {
    fn model_options(&self) -> Option<ModelOptions> {
        if self.num_predict.is_none() && self.num_ctx.is_none() {
            None
        } else {
            Some(ModelOptions {
                num_predict: self.num_predict,
                num_ctx: self.num_ctx,
            })
        }
    }
}

/// One decoded line of `/api/generate`, or the whole non-streamed reply
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: String,

    #[serde(default)]
    pub done: bool,

    #[serde(default)]
    pub eval_count: Option<u64>,

    #[serde(default)]
    pub total_duration: Option<u64>,
}

/// Non-streamed `/api/generate` reply has the same shape as a chunk
pub type GenerateResponse = GenerateChunk;

impl StreamChunk for GenerateChunk {
    fn is_done(&self) -> bool {
        self.done
    }
}

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    timeouts: Timeouts,
}

impl OllamaClient {
    /// Create new Ollama client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, Timeouts::default())
    }

    /// Create Ollama client with custom configuration
    pub fn with_config(base_url: &str, timeouts: Timeouts) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeouts,
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get configured timeouts
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if Ollama answers on the model listing endpoint
    pub async fn is_available(&self) -> bool {
        let url = self.url("/api/tags");
        match self
            .client
            .get(&url)
            .timeout(self.timeouts.status)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "status probe failed");
                false
            }
        }
    }

    /// List installed models
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.url("/api/tags");
        debug!(%url, "listing models");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeouts.request)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &self.base_url))?;

        let response = self.check_status(response).await?;
        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &self.base_url))?;

        Ok(models.models)
    }

    /// Single-turn completion, whole reply at once
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerateResponse> {
        let request = GenerateRequest::new(model, prompt, false, options);
        let response = self.post("/api/generate", &request).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &self.base_url))
    }

    /// Single-turn completion as a stream of chunks
    ///
    /// The caller concatenates `response` fields; the stream ends after
    /// the chunk with `done = true`.
    pub async fn generate_stream(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<impl Stream<Item = Result<GenerateChunk>>> {
        let request = GenerateRequest::new(model, prompt, true, options);
        let response = self.post_streaming("/api/generate", &request).await?;
        Ok(Self::chunks(response, self.timeouts.request))
    }

    /// Multi-turn chat, whole reply at once
    pub async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<ChatResponse> {
        let request = ChatRequest::new(model, messages, false, options);
        let response = self.post("/api/chat", &request).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &self.base_url))
    }

    /// Multi-turn chat as a stream of chunks
    ///
    /// Feed the result to [`crate::streaming::chat_events`] to get
    /// thinking/content events.
    pub async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<impl Stream<Item = Result<ChatChunk>>> {
        let request = ChatRequest::new(model, messages, true, options);
        let response = self.post_streaming("/api/chat", &request).await?;
        Ok(Self::chunks(response, self.timeouts.request))
    }

    /// Chat through the OpenAI-compatible endpoint
    pub async fn openai_chat(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let request = CompatRequest {
            model,
            messages,
            temperature,
            max_tokens,
        };
        let url = self.url("/v1/chat/completions");
        debug!(%url, model, "openai-compatible chat");

        let response = self
            .client
            .post(&url)
            .bearer_auth(OPENAI_COMPAT_KEY)
            .timeout(self.timeouts.request)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &self.base_url))?;

        let response = self.check_status(response).await?;
        let completion: CompatResponse = response
            .json()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &self.base_url))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ClientError::Decode("completion has no choices".to_string()))
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response> {
        let url = self.url(path);
        debug!(%url, "sending request");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeouts.request)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &self.base_url))?;

        self.check_status(response).await
    }

    /// Like [`Self::post`], but the request limit covers the wait for the
    /// response head only; the body is limited per read by [`Self::chunks`]
    async fn post_streaming<B: Serialize>(&self, path: &str, body: &B) -> Result<Response> {
        let url = self.url(path);
        debug!(%url, "sending streaming request");

        let send = self.client.post(&url).json(body).send();
        let response = tokio::time::timeout(self.timeouts.request, send)
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(|e| ClientError::from_reqwest(e, &self.base_url))?;

        self.check_status(response).await
    }

    async fn check_status(&self, response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ClientError::Api { status, body })
    }

    /// Decode a streamed body; a gap longer than `idle` between reads
    /// ends the stream with [`ClientError::Timeout`]
    fn chunks<T: StreamChunk>(response: Response, idle: Duration) -> impl Stream<Item = Result<T>> {
        let body = Box::pin(response.bytes_stream());
        let bytes = Box::pin(stream::unfold(body, move |mut body| async move {
            match tokio::time::timeout(idle, body.next()).await {
                Ok(Some(read)) => Some((read.map_err(ClientError::from_stream), body)),
                Ok(None) => None,
                Err(_) => Some((Err(ClientError::Timeout), body)),
            }
        }));
        decode_stream(bytes)
    }
}

/// Concatenate the `response` fields of a generate stream
pub async fn collect_generate<S>(chunks: S) -> Result<String>
where
    S: Stream<Item = Result<GenerateChunk>>,
{
    futures_util::pin_mut!(chunks);
    let mut text = String::new();
    while let Some(chunk) = chunks.next().await {
        text.push_str(&chunk?.response);
    }
    Ok(text)
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ModelOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<&'a str>,
}

impl<'a> GenerateRequest<'a> {
    fn new(model: &'a str, prompt: &'a str, stream: bool, options: &'a GenerationOptions) -> Self {
        Self {
            model,
            prompt,
            stream,
            temperature: options.temperature,
            options: options.model_options(),
            keep_alive: options.keep_alive.as_deref(),
        }
    }
}

/// Ollama chat request
#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ModelOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<&'a str>,
}

impl<'a> ChatRequest<'a> {
    fn new(
        model: &'a str,
        messages: &'a [Message],
        stream: bool,
        options: &'a GenerationOptions,
    ) -> Self {
        Self {
            model,
            messages,
            stream,
            temperature: options.temperature,
            options: options.model_options(),
            keep_alive: options.keep_alive.as_deref(),
        }
    }
}

/// Model runtime options
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_ctx: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CompatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompatResponse {
    choices: Vec<CompatChoice>,
}

#[derive(Debug, Deserialize)]
struct CompatChoice {
    message: CompatMessage,
}

#[derive(Debug, Deserialize)]
struct CompatMessage {
    #[serde(default)]
    content: String,
}
