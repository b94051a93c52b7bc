//! Integration tests for the chatenrich CLI: argument parsing, one-shot commands against a
//! mockito server, and a full simulate session over the in-memory transport.

use annotation_client::{EndpointConfig, HttpAnnotationClient};
use chat_cli::simulate::{self, SimulateOptions};
use chat_cli::{commands, Cli, Commands, ConsoleNotifier};
use chat_core::Persona;
use clap::Parser;
use enrichment::EnrichConfig;
use mockito::Matcher;
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

fn client_for(server: &mockito::ServerGuard) -> HttpAnnotationClient {
    HttpAnnotationClient::new(EndpointConfig::single(server.url())).unwrap()
}

/// **Test: Subcommands and flags parse as documented.**
#[test]
fn test_parse_subcommands() {
    let cli = Cli::try_parse_from(["chatenrich", "translate", "hola", "--to", "en"]).unwrap();
    assert_eq!(
        cli.command,
        Commands::Translate {
            text: "hola".to_string(),
            to: "en".to_string()
        }
    );

    let cli = Cli::try_parse_from(["chatenrich", "search", "trip", "--persona", "coach"]).unwrap();
    assert_eq!(
        cli.command,
        Commands::Search {
            query: "trip".to_string(),
            persona: Persona::MotivationalCoach
        }
    );

    let cli = Cli::try_parse_from(["chatenrich", "--user", "me", "simulate", "--peer", "bob"]).unwrap();
    assert_eq!(cli.user.as_deref(), Some("me"));
    assert!(matches!(cli.command, Commands::Simulate { ref peer, autopilot: false, .. } if peer == "bob"));
}

/// **Test: Invalid persona and missing translation target are rejected.**
#[test]
fn test_parse_rejects_invalid_args() {
    assert!(Cli::try_parse_from(["chatenrich", "search", "trip", "--persona", "pirate"]).is_err());
    assert!(Cli::try_parse_from(["chatenrich", "translate", "hola"]).is_err());
}

/// **Test: --user overrides LOCAL_USER_ID when loading config.**
#[test]
#[serial]
fn test_load_config_user_override() {
    std::env::set_var("LOCAL_USER_ID", "env-user");

    let config = chat_cli::load_config(Some("cli-user".to_string())).unwrap();
    assert_eq!(config.local_user_id, "cli-user");

    let config = chat_cli::load_config(None).unwrap();
    assert_eq!(config.local_user_id, "env-user");
    std::env::remove_var("LOCAL_USER_ID");
}

/// **Test: suggest prints the normalized, numbered list.**
#[tokio::test]
async fn test_suggest_command_output() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/suggest")
        .with_status(200)
        .with_body(r#"{"suggestions": ["Sure!", "Sure! ", "Later", "No", "Maybe"]}"#)
        .create_async()
        .await;

    let out = commands::suggest(&client_for(&server), "dinner?").await.unwrap();

    assert_eq!(out, "1. Sure!\n2. Later\n3. No");
}

/// **Test: insight sends stdin lines and formats the report.**
#[tokio::test]
async fn test_insight_command_output() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/insight")
        .match_body(Matcher::Json(
            json!({"messages": ["You: trip?", "Other: friday!"]}),
        ))
        .with_status(200)
        .with_body(r#"{"summary": "Planning a trip.", "sentimentDistribution": {"joy": 100}}"#)
        .create_async()
        .await;

    let lines = commands::read_lines("You: trip?\nOther: friday!\n");
    let out = commands::insight(&client_for(&server), &lines).await.unwrap();

    assert!(out.starts_with("Summary: Planning a trip."));
    assert!(out.contains("100.0%"));
}

/// **Test: simulate enriches a peer line and autopilot answers it once.**
#[tokio::test]
async fn test_simulate_session_with_autopilot() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/analyze")
        .with_status(200)
        .with_body(r#"[{"label": "neutral"}]"#)
        .create_async()
        .await;
    server
        .mock("POST", "/suggest")
        .with_status(200)
        .with_body(r#"{"suggestions": ["yes"]}"#)
        .create_async()
        .await;
    let auto_reply = server
        .mock("POST", "/auto-reply")
        .match_body(Matcher::Json(json!({"message": "are you there?", "context": ""})))
        .with_status(200)
        .with_body(r#"{"reply": "Yes, here!"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut config = EnrichConfig::new("me");
    config.endpoints = EndpointConfig::single(server.url());
    config.autopilot_delay = Duration::from_millis(10);
    let client = Arc::new(HttpAnnotationClient::new(config.endpoints.clone()).unwrap());
    let options = SimulateOptions {
        peer: "bob".to_string(),
        peer_name: Some("Bob".to_string()),
        autopilot: true,
    };

    let sent = simulate::run(
        config,
        client,
        Arc::new(ConsoleNotifier::new(false)),
        options,
        &b"are you there?\n"[..],
    )
    .await
    .unwrap();

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text.as_deref(), Some("Yes, here!"));
    assert_eq!(sent[0].receiver_id, "bob");
    auto_reply.assert_async().await;
}

/// **Test: /me sends a trimmed local message; nothing is enriched for it.**
#[tokio::test]
async fn test_simulate_local_send() {
    let mut server = mockito::Server::new_async().await;
    let analyze = server.mock("POST", "/analyze").expect(0).create_async().await;

    let mut config = EnrichConfig::new("me");
    config.endpoints = EndpointConfig::single(server.url());
    let client = Arc::new(HttpAnnotationClient::new(config.endpoints.clone()).unwrap());
    let options = SimulateOptions {
        peer: "bob".to_string(),
        peer_name: None,
        autopilot: false,
    };

    let sent = simulate::run(
        config,
        client,
        Arc::new(ConsoleNotifier::new(false)),
        options,
        &b"/me   see you at 8  \n"[..],
    )
    .await
    .unwrap();

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text.as_deref(), Some("see you at 8"));
    analyze.assert_async().await;
}
