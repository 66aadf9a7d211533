//! Display manager for the chat REPL
//!
//! Banners, status lines, spinners and the incremental renderer used while
//! an answer streams in.

use crate::errors::START_HINT;
use crate::repl::session::ChatSession;
use crate::types::{Message, Role};
use colored::*;
use crossterm::{
    cursor::MoveLeft,
    queue,
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

/// Suffix shown after the in-progress answer
pub const TYPING_CURSOR: &str = "▌";

/// Shown when a stream finishes without any visible content
pub const NO_RESPONSE_NOTICE: &str =
    "[No response generated - the model may still be thinking. Try asking again or reducing max tokens.]";

/// Spinner tick rate (10 FPS)
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Display manager for REPL UI
pub struct DisplayManager {
    tick_interval: Duration,
}

impl DisplayManager {
    pub fn new() -> Self {
        DisplayManager {
            tick_interval: TICK_INTERVAL,
        }
    }

    /// Show welcome banner
    pub fn show_banner(&self, version: &str, session: &ChatSession) {
        let width = 64;
        let settings = session.settings();
        println!("\n{}", "=".repeat(width).cyan());
        println!("{}", format!("  ollamachat {} - Local Ollama Chat", version).bold().cyan());
        println!(
            "{}",
            format!(
                "  Model: {} | Temperature: {:.1} | Max tokens: {} | Streaming: {}",
                settings.model,
                settings.temperature,
                settings.max_tokens,
                on_off(settings.streaming)
            )
            .dimmed()
        );
        println!("{}\n", "=".repeat(width).cyan());
        println!(
            "Type your message (or {} for commands, {} to quit)\n",
            "/help".green(),
            "/exit".green()
        );
    }

    /// Server status line; the chat is disabled while offline
    pub fn show_server_status(&self, session: &ChatSession, base_url: &str) {
        let server = session.server();
        if server.online {
            println!("{} Ollama is running at {}", "✅".green(), base_url);
            if server.models.is_empty() {
                self.show_warning("No models found. Pull a model first (ollama pull <model>).");
            }
        } else {
            println!("{} {}", "❌".red(), "Ollama is not running".red().bold());
            println!("   Start it with: {}", START_HINT.cyan());
            println!("   Chat is disabled until the server is reachable ({} to re-check).", "/status".green());
        }
    }

    /// Spinner shown while the model works
    pub fn spinner(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(self.tick_interval);
        pb
    }

    /// One transcript entry
    pub fn show_message(&self, message: &Message) {
        println!("{} {}", role_label(message.role), message.content);
    }

    /// Transcript entries, oldest first
    pub fn show_transcript(&self, messages: &[Message]) {
        if messages.is_empty() {
            println!("{}", "No messages yet.".dimmed());
            return;
        }
        for message in messages {
            self.show_message(message);
        }
    }

    /// Show section header
    pub fn show_section(&self, title: &str) {
        println!("\n{}", title.bold().cyan());
        println!("{}", "-".repeat(40).cyan());
    }

    /// Aligned key/value line
    pub fn show_field(&self, label: &str, value: &str) {
        println!("  {:<20} {}", label, value);
    }

    /// Display error message
    pub fn show_error(&self, error: &str) {
        println!("{} {}", "Error:".red().bold(), error.red());
    }

    /// Display warning message
    pub fn show_warning(&self, warning: &str) {
        println!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }

    /// Display info message
    pub fn show_info(&self, info: &str) {
        println!("{} {}", "Info:".cyan(), info);
    }
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Colored speaker label
pub fn role_label(role: Role) -> ColoredString {
    match role {
        Role::User => "You:".green().bold(),
        Role::Assistant => "Assistant:".cyan().bold(),
        Role::System => "System:".magenta().bold(),
    }
}

/// Caption printed under each answer
pub fn elapsed_caption(elapsed: Duration) -> String {
    format!("Response generated in {:.2} seconds", elapsed.as_secs_f64())
}

pub fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Incremental renderer for a streamed answer
///
/// Each fragment is printed followed by [`TYPING_CURSOR`]; the cursor is
/// erased before the next fragment and when the answer ends.
pub struct StreamRenderer<'a, W: Write> {
    out: &'a mut W,
    cursor_shown: bool,
    written: usize,
}

impl<'a, W: Write> StreamRenderer<'a, W> {
    pub fn new(out: &'a mut W) -> Self {
        Self {
            out,
            cursor_shown: false,
            written: 0,
        }
    }

    /// Append a content fragment
    pub fn push(&mut self, fragment: &str) -> io::Result<()> {
        self.erase_cursor()?;
        write!(self.out, "{}{}", fragment, TYPING_CURSOR)?;
        self.cursor_shown = true;
        self.written += fragment.len();
        self.out.flush()
    }

    /// Remove the cursor and end the line
    pub fn finish(&mut self) -> io::Result<()> {
        self.erase_cursor()?;
        writeln!(self.out)?;
        self.out.flush()
    }

    /// Replace an empty answer with the no-response notice
    pub fn finish_empty(&mut self) -> io::Result<()> {
        self.erase_cursor()?;
        writeln!(self.out, "{}", NO_RESPONSE_NOTICE.italic().dimmed())?;
        self.out.flush()
    }

    /// Bytes of content written so far
    pub fn written(&self) -> usize {
        self.written
    }

    fn erase_cursor(&mut self) -> io::Result<()> {
        if self.cursor_shown {
            queue!(self.out, MoveLeft(1), Clear(ClearType::UntilNewLine))?;
            self.cursor_shown = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_renderer_shows_fragments_with_cursor() {
        let mut out = Vec::new();
        {
            let mut renderer = StreamRenderer::new(&mut out);
            renderer.push("Hi").unwrap();
            renderer.push(" there").unwrap();
            assert_eq!(renderer.written(), 8);
        }
        let text = rendered(out);
        assert!(text.starts_with("Hi▌"));
        assert!(text.ends_with(" there▌"));
        assert_eq!(text.matches(TYPING_CURSOR).count(), 2);
    }

    #[test]
    fn test_renderer_finish_erases_cursor() {
        let mut out = Vec::new();
        {
            let mut renderer = StreamRenderer::new(&mut out);
            renderer.push("Hi").unwrap();
            renderer.finish().unwrap();
        }
        let text = rendered(out);
        // Cursor printed once, then erased with an escape sequence
        assert!(text.ends_with('\n'));
        assert!(text.contains("\x1b["));
    }

    #[test]
    fn test_renderer_empty_answer() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        {
            let mut renderer = StreamRenderer::new(&mut out);
            renderer.finish_empty().unwrap();
        }
        let text = rendered(out);
        assert_eq!(text, format!("{}\n", NO_RESPONSE_NOTICE));
    }

    #[test]
    fn test_spinner_creation() {
        let display = DisplayManager::new();
        let pb = display.spinner("Thinking...");
        assert_eq!(pb.message(), "Thinking...");
        pb.finish_and_clear();
    }

    #[test]
    fn test_message_display() {
        let display = DisplayManager::new();
        display.show_error("Test error");
        display.show_warning("Test warning");
        display.show_info("Test info");
        display.show_transcript(&[]);
        display.show_message(&Message::user("hello"));
    }

    #[test]
    fn test_elapsed_caption() {
        assert_eq!(
            elapsed_caption(Duration::from_millis(1234)),
            "Response generated in 1.23 seconds"
        );
    }

    #[test]
    fn test_on_off() {
        assert_eq!(on_off(true), "on");
        assert_eq!(on_off(false), "off");
    }
}
