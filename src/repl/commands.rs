//! Command handler for REPL built-in commands
//!
//! Slash commands adjust the session settings, inspect the server and
//! manage the transcript. They work whether or not the server is up.

use crate::models::format_gib;
use crate::repl::display::{on_off, DisplayManager};
use crate::repl::session::ChatSession;
use crate::repl::turn::refresh_server;
use crate::streaming::OllamaClient;
use crate::telemetry::ollama_memory_display;
use anyhow::Result;
use chrono::Local;
use colored::*;
use std::path::PathBuf;

const DEFAULT_HISTORY_LIMIT: usize = 10;

/// REPL command types
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Model { name: Option<String> },
    Models,
    Temperature { value: Option<f32> },
    MaxTokens { value: Option<u32> },
    Stream { enable: Option<bool> },
    Clear,
    Export { path: Option<PathBuf> },
    Stats,
    Status,
    History { limit: Option<usize> },
    Exit,
    Invalid { message: String },
    Unknown { input: String },
}

/// Parses and executes REPL commands
pub struct CommandHandler {
    export_dir: PathBuf,
}

impl CommandHandler {
    /// Create a handler that exports into `export_dir`
    pub fn new(export_dir: PathBuf) -> Self {
        CommandHandler { export_dir }
    }

    /// Parse input string into a command
    pub fn parse(&self, input: &str) -> Command {
        let trimmed = input.trim();

        let Some(body) = trimmed.strip_prefix('/') else {
            return Command::Unknown {
                input: input.to_string(),
            };
        };

        let parts: Vec<&str> = body.split_whitespace().collect();
        let Some(name) = parts.first() else {
            return Command::Unknown {
                input: input.to_string(),
            };
        };
        let arg = parts.get(1).copied();

        match name.to_lowercase().as_str() {
            "help" | "h" => Command::Help,
            "exit" | "quit" | "q" => Command::Exit,
            "model" => Command::Model {
                name: arg.map(str::to_string),
            },
            "models" => Command::Models,
            "temperature" | "temp" => match arg.map(str::parse::<f32>) {
                None => Command::Temperature { value: None },
                Some(Ok(value)) => Command::Temperature { value: Some(value) },
                Some(Err(_)) => Command::Invalid {
                    message: format!("'{}' is not a number", arg.unwrap_or_default()),
                },
            },
            "max-tokens" | "max_tokens" => match arg.map(str::parse::<u32>) {
                None => Command::MaxTokens { value: None },
                Some(Ok(value)) => Command::MaxTokens { value: Some(value) },
                Some(Err(_)) => Command::Invalid {
                    message: format!("'{}' is not a whole number", arg.unwrap_or_default()),
                },
            },
            "stream" => match arg.map(|s| s.to_lowercase()) {
                None => Command::Stream { enable: None },
                Some(s) if matches!(s.as_str(), "on" | "true" | "1") => {
                    Command::Stream { enable: Some(true) }
                }
                Some(s) if matches!(s.as_str(), "off" | "false" | "0") => {
                    Command::Stream { enable: Some(false) }
                }
                Some(s) => Command::Invalid {
                    message: format!("expected on or off, got '{}'", s),
                },
            },
            "clear" | "reset" => Command::Clear,
            "export" => Command::Export {
                path: arg.map(PathBuf::from),
            },
            "stats" => Command::Stats,
            "status" => Command::Status,
            "history" => Command::History {
                limit: arg.and_then(|s| s.parse().ok()),
            },
            _ => Command::Unknown {
                input: input.to_string(),
            },
        }
    }

    /// Execute a command
    ///
    /// Returns true if REPL should continue, false if should exit
    pub async fn execute(
        &self,
        command: Command,
        session: &mut ChatSession,
        client: &OllamaClient,
        display: &DisplayManager,
    ) -> Result<bool> {
        match command {
            Command::Help => self.show_help(),
            Command::Exit => {
                println!("{}", "Goodbye!".green());
                return Ok(false);
            }
            Command::Model { name: None } => {
                display.show_info(&format!("Current model: {}", session.settings().model));
            }
            Command::Model { name: Some(name) } => {
                let server = session.server();
                if !server.models.is_empty() && !server.has_model(&name) {
                    display.show_error(&format!(
                        "Model '{}' is not installed. Available: {}",
                        name,
                        server.model_names().join(", ")
                    ));
                } else {
                    session.set_model(name.as_str());
                    display.show_info(&format!("Model set to {}", name));
                }
            }
            Command::Models => self.show_models(session, client, display).await,
            Command::Temperature { value: None } => {
                display.show_info(&format!(
                    "Temperature: {:.1}",
                    session.settings().temperature
                ));
            }
            Command::Temperature { value: Some(value) } => match session.set_temperature(value) {
                Ok(()) => display.show_info(&format!("Temperature set to {:.1}", value)),
                Err(e) => display.show_error(&e.to_string()),
            },
            Command::MaxTokens { value: None } => {
                display.show_info(&format!("Max tokens: {}", session.settings().max_tokens));
            }
            Command::MaxTokens { value: Some(value) } => match session.set_max_tokens(value) {
                Ok(()) => display.show_info(&format!("Max tokens set to {}", value)),
                Err(e) => display.show_error(&e.to_string()),
            },
            Command::Stream { enable } => {
                let enable = enable.unwrap_or(!session.settings().streaming);
                session.set_streaming(enable);
                display.show_info(&format!("Streaming {}", on_off(enable)));
            }
            Command::Clear => {
                session.clear();
                println!("{}", "Chat cleared.".yellow());
            }
            Command::Export { path } => {
                let result = match path {
                    Some(path) => session.export_to_file(&path).map(|_| path),
                    None => session.export_to(&self.export_dir, Local::now()),
                };
                match result {
                    Ok(path) => display.show_info(&format!(
                        "Exported {} messages to {}",
                        session.message_count(),
                        path.display()
                    )),
                    Err(e) => display.show_error(&format!("Export failed: {}", e)),
                }
            }
            Command::Stats => self.show_stats(session, display),
            Command::Status => {
                if let Some(model) = refresh_server(client, session).await {
                    display.show_info(&format!("Switched to installed model {}", model));
                }
                display.show_server_status(session, client.base_url());
            }
            Command::History { limit } => {
                let messages = session.recent(limit.unwrap_or(DEFAULT_HISTORY_LIMIT));
                display.show_transcript(messages);
            }
            Command::Invalid { message } => display.show_error(&message),
            Command::Unknown { input } => {
                println!("{}", format!("Unknown command: {}", input).red());
                println!("Type {} for available commands", "/help".cyan());
            }
        }
        Ok(true)
    }

    /// Display help information
    fn show_help(&self) {
        println!("\n{}", "Available Commands:".bold().cyan());
        println!("{}", "=".repeat(60).cyan());

        let commands = [
            ("/help, /h", "Show this help message"),
            ("/model [name]", "Show or switch the chat model"),
            ("/models", "List installed models"),
            ("/temperature <0.0-2.0>", "Show or set sampling temperature"),
            ("/max-tokens <100-8000>", "Show or set the response length limit"),
            ("/stream [on|off]", "Toggle streaming responses"),
            ("/clear", "Clear the conversation"),
            ("/export [path]", "Save the conversation as JSON"),
            ("/stats", "Show session statistics"),
            ("/status", "Re-check the Ollama server"),
            ("/history [n]", "Show last n messages (default: 10)"),
            ("/exit, /quit, /q", "Exit REPL"),
        ];

        for (cmd, desc) in commands {
            println!("  {:<24} {}", cmd.green(), desc);
        }

        println!("\n{}", "Usage:".bold());
        println!("  - Type your message directly (no / prefix)");
        println!("  - Use {} for input history", "UP/DOWN arrows".cyan());
        println!("  - Press {} or {} to exit", "Ctrl-D".cyan(), "/exit".cyan());
        println!();
    }

    async fn show_models(
        &self,
        session: &mut ChatSession,
        client: &OllamaClient,
        display: &DisplayManager,
    ) {
        refresh_server(client, session).await;
        let server = session.server();
        if !server.online {
            display.show_server_status(session, client.base_url());
            return;
        }
        if server.models.is_empty() {
            display.show_warning("No models found. Pull a model first (ollama pull <model>).");
            return;
        }

        display.show_section(&format!("Installed Models ({}):", server.models.len()));
        for model in &server.models {
            let marker = if model.name == session.settings().model {
                "*".green()
            } else {
                " ".normal()
            };
            let detail = model.description().unwrap_or_default();
            println!(
                "  {} {:<32} {:>10}  {}",
                marker,
                model.name,
                format_gib(model.size),
                detail.dimmed()
            );
        }
        println!();
    }

    fn show_stats(&self, session: &ChatSession, display: &DisplayManager) {
        let settings = session.settings();
        let average = session
            .latency()
            .average()
            .map(|avg| format!("{:.2}s", avg.as_secs_f64()))
            .unwrap_or_else(|| "No data yet".to_string());

        display.show_section("Session Statistics:");
        display.show_field("Messages", &session.message_count().to_string());
        display.show_field("Avg response time", &average);
        display.show_field("Ollama memory", &ollama_memory_display());
        display.show_field("Model", &settings.model);
        display.show_field("Temperature", &format!("{:.1}", settings.temperature));
        display.show_field("Max tokens", &settings.max_tokens.to_string());
        display.show_field("Streaming", on_off(settings.streaming));
        println!();
    }
}

/// Check if input is a command (starts with /)
pub fn is_command(input: &str) -> bool {
    input.trim().starts_with('/')
}
