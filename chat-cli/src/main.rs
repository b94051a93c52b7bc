//! chatenrich CLI: one-shot annotation commands and an enriched chat simulation. Config from env
//! and optional CLI args.

use annotation_client::{AnnotationClient, HttpAnnotationClient};
use anyhow::{Context, Result};
use chat_cli::commands;
use chat_cli::simulate::{self, SimulateOptions};
use chat_cli::{load_config, Cli, Commands, ConsoleNotifier};
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            peer,
            peer_name,
            autopilot,
            activate_on_notify,
        } => {
            let config = load_config(cli.user)?;
            chat_core::init_tracing(&config.log_file)?;
            let client: Arc<dyn AnnotationClient> =
                Arc::new(HttpAnnotationClient::new(config.endpoints.clone())?);
            let notifier = Arc::new(ConsoleNotifier::new(activate_on_notify));
            let options = SimulateOptions {
                peer,
                peer_name,
                autopilot,
            };
            let sent = simulate::run(
                config,
                client,
                notifier,
                options,
                BufReader::new(tokio::io::stdin()),
            )
            .await?;
            println!("{} message(s) sent", sent.len());
            Ok(())
        }
        Commands::Analyze { text } => {
            print_output(commands::analyze(&one_shot_client()?, &text).await)
        }
        Commands::Suggest { text } => {
            print_output(commands::suggest(&one_shot_client()?, &text).await)
        }
        Commands::Complete { prompt } => {
            print_output(commands::complete(&one_shot_client()?, &prompt).await)
        }
        Commands::Translate { text, to } => {
            print_output(commands::translate(&one_shot_client()?, &text, &to).await)
        }
        Commands::Insight => {
            let client = one_shot_client()?;
            let lines = commands::read_lines(&read_stdin().await?);
            print_output(commands::insight(&client, &lines).await)
        }
        Commands::Search { query, persona } => {
            let client = one_shot_client()?;
            let history = commands::read_lines(&read_stdin().await?);
            print_output(commands::search(&client, &query, &history, persona).await)
        }
    }
}

/// Console-only tracing plus an HTTP client from the endpoint env vars.
fn one_shot_client() -> Result<HttpAnnotationClient> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let endpoints = annotation_client::EndpointConfig::from_env()
        .context("Load endpoint config (ANNOTATION_BASE_URL, INSIGHT_BASE_URL)")?;
    Ok(HttpAnnotationClient::new(endpoints)?)
}

fn print_output(output: Result<String>) -> Result<()> {
    println!("{}", output?);
    Ok(())
}

async fn read_stdin() -> Result<String> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Read stdin")?;
    Ok(input)
}
