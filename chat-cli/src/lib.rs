//! # chat-cli
//!
//! Argument parsing, config loading, one-shot annotation commands and the `simulate` session
//! driver for the `chatenrich` binary.

pub mod cli;
pub mod commands;
pub mod console;
pub mod simulate;

pub use cli::{load_config, Cli, Commands};
pub use console::ConsoleNotifier;
