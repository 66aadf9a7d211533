//! Command-line argument parsing for ollamachat
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use crate::cli::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ollamachat - Talk to a local Ollama server
#[derive(Parser, Debug)]
#[command(name = "ollamachat")]
#[command(version)]
#[command(about = "Demo client and interactive terminal chat for a local Ollama server", long_about = None)]
pub struct Args {
    /// Model to use (overrides the configured demo or chat model)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Ollama host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Ollama port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Ollama base URL (takes precedence over --host and --port)
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand (runs the demo when omitted)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the fixed API demonstration sequence
    Demo,

    /// Start the interactive chat
    Chat,

    /// List installed models
    Models,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Subcommand to run, the demo when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Demo)
    }

    /// Base URL assembled from --host/--port, if either was given
    pub fn ollama_url(&self) -> Option<String> {
        if self.host.is_none() && self.port.is_none() {
            return None;
        }
        let host = self.host.as_deref().unwrap_or("localhost");
        let port = self.port.unwrap_or(11434);
        Some(format!("http://{}:{}", host, port))
    }

    /// Apply command-line overrides on top of loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = self.url.clone().or_else(|| self.ollama_url()) {
            config.ollama.base_url = url;
        }
        if let Some(model) = &self.model {
            config.ollama.demo_model = model.clone();
            config.ollama.chat_model = model.clone();
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default log filter for this level
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "ollamachat=info",
            Verbosity::VeryVerbose => "ollamachat=debug",
        }
    }
}
