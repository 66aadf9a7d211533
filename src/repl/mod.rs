//! Interactive terminal chat
//!
//! Reads prompts and slash commands, keeps the transcript in a
//! [`ChatSession`] and streams answers from the server.

pub mod commands;
pub mod display;
pub mod input;
pub mod session;
pub mod turn;

use anyhow::Result;
use colored::*;
use std::io;
use std::path::PathBuf;
use tracing::debug;

use crate::cli::Config;
use crate::repl::commands::{is_command, CommandHandler};
pub use crate::repl::display::DisplayManager;
use crate::repl::input::{Input, InputHandler};
pub use crate::repl::session::{ChatSession, ChatSettings, ServerState};
pub use crate::repl::turn::{refresh_server, run_turn, TurnOutcome};
use crate::streaming::OllamaClient;

/// REPL session coordinator
pub struct ChatRepl {
    client: OllamaClient,
    session: ChatSession,
    input_handler: InputHandler,
    command_handler: CommandHandler,
    display_manager: DisplayManager,
}

impl ChatRepl {
    /// Build a REPL from configuration
    pub fn new(client: OllamaClient, config: &Config) -> Result<Self> {
        Self::with_history(client, config, config.history_file())
    }

    /// Build a REPL with an explicit history file
    pub fn with_history(client: OllamaClient, config: &Config, history: PathBuf) -> Result<Self> {
        Ok(ChatRepl {
            client,
            session: ChatSession::new(ChatSettings::from_config(config)),
            input_handler: InputHandler::with_history(history)?,
            command_handler: CommandHandler::new(config.export_dir()),
            display_manager: DisplayManager::new(),
        })
    }

    /// Run until /exit or Ctrl-D
    pub async fn run(&mut self, version: &str) -> Result<()> {
        self.refresh().await;
        self.display_manager.show_banner(version, &self.session);
        self.display_manager
            .show_server_status(&self.session, self.client.base_url());

        loop {
            let line = match self.input_handler.read_line()? {
                Input::Line(line) => line,
                Input::Interrupted => {
                    println!("{}", "(Ctrl-D or /exit to quit)".dimmed());
                    continue;
                }
                Input::Eof => break,
            };

            if !self.handle_input(&line).await? {
                break;
            }
        }

        if let Err(e) = self.input_handler.save_history() {
            self.display_manager
                .show_warning(&format!("Could not save history: {}", e));
        }
        Ok(())
    }

    /// Handle one line of input (command or prompt)
    ///
    /// Returns true if session should continue, false to exit
    pub async fn handle_input(&mut self, input: &str) -> Result<bool> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(true);
        }

        if is_command(input) {
            let command = self.command_handler.parse(input);
            debug!(?command, "command");
            return self
                .command_handler
                .execute(
                    command,
                    &mut self.session,
                    &self.client,
                    &self.display_manager,
                )
                .await;
        }

        self.refresh().await;
        if !self.session.server().online {
            self.display_manager
                .show_server_status(&self.session, self.client.base_url());
            return Ok(true);
        }

        run_turn(
            &self.client,
            &mut self.session,
            &self.display_manager,
            input,
            &mut io::stdout(),
        )
        .await?;
        Ok(true)
    }

    /// Session state (immutable)
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    async fn refresh(&mut self) {
        if let Some(model) = refresh_server(&self.client, &mut self.session).await {
            self.display_manager.show_warning(&format!(
                "Model not installed, using {} instead",
                model
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::Timeouts;
    use tempfile::TempDir;

    fn offline_repl(dir: &TempDir) -> ChatRepl {
        let client = OllamaClient::with_config("http://127.0.0.1:1", Timeouts::default()).unwrap();
        let mut config = Config::default();
        config.paths.export_dir = dir.path().to_string_lossy().into_owned();
        ChatRepl::with_history(client, &config, dir.path().join("history")).unwrap()
    }

    #[tokio::test]
    async fn test_empty_input_continues() {
        let dir = TempDir::new().unwrap();
        let mut repl = offline_repl(&dir);
        assert!(repl.handle_input("   ").await.unwrap());
    }

    #[tokio::test]
    async fn test_exit_command() {
        let dir = TempDir::new().unwrap();
        let mut repl = offline_repl(&dir);
        assert!(!repl.handle_input("/exit").await.unwrap());
    }

    #[tokio::test]
    async fn test_prompt_refused_while_offline() {
        let dir = TempDir::new().unwrap();
        let mut repl = offline_repl(&dir);

        assert!(repl.handle_input("hello?").await.unwrap());
        assert_eq!(repl.session().message_count(), 0);
        assert!(!repl.session().server().online);
    }

    #[tokio::test]
    async fn test_commands_work_while_offline() {
        let dir = TempDir::new().unwrap();
        let mut repl = offline_repl(&dir);

        assert!(repl.handle_input("/temperature 1.5").await.unwrap());
        assert_eq!(repl.session().settings().temperature, 1.5);
    }
}
