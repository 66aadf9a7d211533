//! Chat session state
//!
//! One value owns everything a REPL session mutates: the transcript, the
//! user-adjustable settings, the latency window and what is known about
//! the server. Nothing here touches the network.

use crate::cli::config::{validate_max_tokens, validate_temperature, Config};
use crate::errors::Result;
use crate::models::{select_model, ModelInfo};
use crate::streaming::GenerationOptions;
use crate::telemetry::LatencyWindow;
use crate::types::{Message, Role};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings the user can change during a session
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub streaming: bool,
    pub num_ctx: u32,
    pub keep_alive: String,
}

impl ChatSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.ollama.chat_model.clone(),
            temperature: config.generation.temperature,
            max_tokens: config.generation.max_tokens,
            streaming: config.generation.streaming,
            num_ctx: config.generation.num_ctx,
            keep_alive: config.generation.keep_alive.clone(),
        }
    }

    /// Options sent with every chat request
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: Some(self.temperature),
            num_predict: Some(self.max_tokens),
            num_ctx: Some(self.num_ctx),
            keep_alive: Some(self.keep_alive.clone()),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What the last probe learned about the server
#[derive(Debug, Clone, Default)]
pub struct ServerState {
    pub online: bool,
    pub models: Vec<ModelInfo>,
}

impl ServerState {
    pub fn has_model(&self, name: &str) -> bool {
        self.models.iter().any(|m| m.name == name)
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }
}

/// Session-scoped conversation state
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<Message>,
    settings: ChatSettings,
    latency: LatencyWindow,
    server: ServerState,
}

impl ChatSession {
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            messages: Vec::new(),
            settings,
            latency: LatencyWindow::new(),
            server: ServerState::default(),
        }
    }

    /// Transcript in turn order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Last `limit` messages, oldest first
    pub fn recent(&self, limit: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }

    /// Number of completed exchanges
    pub fn turn_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }

    /// Reset the transcript; settings and metrics are kept
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.settings.model = model.into();
    }

    pub fn set_temperature(&mut self, value: f32) -> Result<()> {
        validate_temperature(value)?;
        self.settings.temperature = value;
        Ok(())
    }

    pub fn set_max_tokens(&mut self, value: u32) -> Result<()> {
        validate_max_tokens(value)?;
        self.settings.max_tokens = value;
        Ok(())
    }

    pub fn set_streaming(&mut self, enable: bool) {
        self.settings.streaming = enable;
    }

    pub fn record_latency(&mut self, elapsed: Duration) {
        self.latency.record(elapsed);
    }

    pub fn latency(&self) -> &LatencyWindow {
        &self.latency
    }

    pub fn server(&self) -> &ServerState {
        &self.server
    }

    /// Store a probe result and reconcile the selected model with it
    ///
    /// Returns the model switched to, if the configured one is not installed.
    pub fn update_server(&mut self, online: bool, models: Vec<ModelInfo>) -> Option<String> {
        self.server = ServerState { online, models };
        if !online {
            return None;
        }

        let selected = select_model(&self.settings.model, &self.server.models)?.to_string();
        if selected == self.settings.model {
            None
        } else {
            self.settings.model = selected.clone();
            Some(selected)
        }
    }

    pub fn mark_offline(&mut self) {
        self.server.online = false;
    }

    /// Transcript as a pretty-printed JSON array
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.messages)?)
    }

    /// Write the transcript to `dir` under a timestamped file name
    pub fn export_to(&self, dir: &Path, now: DateTime<Local>) -> Result<PathBuf> {
        let path = dir.join(export_file_name(now));
        self.export_to_file(&path)?;
        Ok(path)
    }

    /// Write the transcript to an explicit path
    pub fn export_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.export_json()?)?;
        Ok(())
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(ChatSettings::default())
    }
}

/// `chat_export_YYYYMMDD_HHMMSS.json`
pub fn export_file_name(now: DateTime<Local>) -> String {
    format!("chat_export_{}.json", now.format("%Y%m%d_%H%M%S"))
}
