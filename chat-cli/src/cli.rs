//! CLI parser and config loading.

use anyhow::Result;
use chat_core::Persona;
use clap::{Parser, Subcommand};
use enrichment::EnrichConfig;

#[derive(Parser, Debug)]
#[command(name = "chatenrich")]
#[command(about = "Chat enrichment CLI: annotate text or run an enriched chat session", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Local user id (overrides LOCAL_USER_ID).
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Sentiment label of a text.
    Analyze { text: String },
    /// Up to three reply suggestions for a text.
    Suggest { text: String },
    /// Complete a prompt into a message.
    Complete { prompt: String },
    /// Translate a text.
    Translate {
        text: String,
        #[arg(long)]
        to: String,
    },
    /// Summary and sentiment breakdown of `You:`/`Other:` lines read from stdin.
    Insight,
    /// Persona-voiced search over history lines read from stdin.
    Search {
        query: String,
        #[arg(short, long, default_value_t = Persona::Friend)]
        persona: Persona,
    },
    /// Run the full pipeline over an in-memory transport; stdin lines are peer messages.
    Simulate {
        #[arg(short, long)]
        peer: String,
        /// Display name used in notification titles.
        #[arg(long)]
        peer_name: Option<String>,
        /// Start with autopilot enabled.
        #[arg(long)]
        autopilot: bool,
        /// Activate every notification, handing the conversation to autopilot.
        #[arg(long)]
        activate_on_notify: bool,
    },
}

/// Load EnrichConfig from the environment. `user` overrides LOCAL_USER_ID.
pub fn load_config(user: Option<String>) -> Result<EnrichConfig> {
    EnrichConfig::load(user)
}
