//! CLI module for ollamachat
//!
//! Handles command-line argument parsing, configuration management and
//! logging setup.

pub mod args;
pub mod config;
pub mod logging;

pub use args::{Args, Commands, Verbosity};
pub use config::Config;
