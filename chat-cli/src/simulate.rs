//! Interactive session over [`LocalTransport`]: each input line is delivered as a message from
//! the peer, unless it is one of the slash commands below.
//!
//! `/me <text>`, `/ai <prompt>`, `/use <n>`, `/insight`, `/search <query>`,
//! `/autopilot on|off`.

use anyhow::Result;
use annotation_client::AnnotationClient;
use chat_core::{LocalTransport, Message, Persona};
use enrichment::{
    AutopilotEvent, AutopilotPhase, EnrichConfig, EnrichmentUpdate, MessageStreamSubscriber,
    Notifier,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::commands::format_insight;

pub struct SimulateOptions {
    pub peer: String,
    pub peer_name: Option<String>,
    pub autopilot: bool,
}

fn describe(update: &EnrichmentUpdate) -> String {
    match update {
        EnrichmentUpdate::Sentiment { message_id, label } => {
            format!("[{}] sentiment: {}", message_id, label)
        }
        EnrichmentUpdate::Suggestions {
            message_id,
            suggestions,
        } => format!("[{}] suggestions: {}", message_id, suggestions.join(" | ")),
        EnrichmentUpdate::Translation { message_id, text } => {
            format!("[{}] translation: {}", message_id, text)
        }
    }
}

/// Emits every update as a line until the channel closes. Updates lost to lag are skipped.
pub async fn forward_updates(
    mut updates: broadcast::Receiver<EnrichmentUpdate>,
    mut emit: impl FnMut(String),
) {
    loop {
        match updates.recv().await {
            Ok(update) => emit(describe(&update)),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Update printer lagged behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

pub async fn run<R>(
    mut config: EnrichConfig,
    client: Arc<dyn AnnotationClient>,
    notifier: Arc<dyn Notifier>,
    options: SimulateOptions,
    input: R,
) -> Result<Vec<Message>>
where
    R: AsyncBufRead + Unpin,
{
    config.autopilot_enabled = config.autopilot_enabled || options.autopilot;
    let transport = LocalTransport::new(config.local_user_id.clone());
    let subscriber = MessageStreamSubscriber::new(
        &config,
        client,
        Arc::new(transport.clone()),
        Some(notifier),
    );
    subscriber
        .select_conversation(&options.peer, options.peer_name.as_deref())
        .await?;

    let updates = subscriber.session().subscribe_updates();
    let printer = tokio::spawn(forward_updates(updates, |line| println!("{}", line)));

    let mut lines = input.lines();
    let mut next_id = 0usize;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = handle_line(&subscriber, &transport, &options, line, &mut next_id).await {
            warn!(error = %e, "Command failed");
            eprintln!("error: {}", e);
        }
    }

    wait_for_autopilot(&subscriber, config.autopilot_delay).await;
    subscriber.teardown();
    printer.abort();

    let sent = transport.sent();
    info!(sent = sent.len(), "step: simulation finished");
    Ok(sent)
}

async fn handle_line(
    subscriber: &MessageStreamSubscriber,
    transport: &LocalTransport,
    options: &SimulateOptions,
    line: &str,
    next_id: &mut usize,
) -> Result<()> {
    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    match command {
        "/me" => {
            let sent = subscriber.composer().send_text(rest, None).await?;
            println!("you: {}", sent.text_or_empty());
        }
        "/ai" => {
            let sent = subscriber.composer().compose_with_ai(rest).await?;
            println!("you (ai): {}", sent.text_or_empty());
        }
        "/use" => {
            let index: usize = rest.parse()?;
            match subscriber.composer().apply_suggestion(index.saturating_sub(1)) {
                Some(text) => {
                    let sent = subscriber.composer().send_text(&text, None).await?;
                    println!("you: {}", sent.text_or_empty());
                }
                None => println!("(no suggestion {})", index),
            }
        }
        "/insight" => println!("{}", format_insight(&subscriber.show_insight().await?)),
        "/search" => {
            for result in subscriber.search(rest, Persona::default()).await {
                println!("search: {}", result);
            }
        }
        "/autopilot" => {
            let event = match rest {
                "on" => AutopilotEvent::Enable,
                "off" => AutopilotEvent::Disable,
                other => anyhow::bail!("expected on|off, got '{}'", other),
            };
            subscriber.autopilot_events().send(event)?;
        }
        _ => {
            *next_id += 1;
            let message = Message::text(
                format!("sim-{}", next_id),
                options.peer.clone(),
                transport.local_user_id(),
                line,
            );
            transport.deliver(&options.peer, message);
        }
    }
    Ok(())
}

/// Gives pending enrichment and a scheduled auto-reply time to finish.
async fn wait_for_autopilot(subscriber: &MessageStreamSubscriber, delay: Duration) {
    tokio::time::sleep(Duration::from_millis(200)).await;
    let deadline = tokio::time::Instant::now() + delay + Duration::from_secs(30);
    while subscriber.autopilot().phase() != AutopilotPhase::Idle
        && tokio::time::Instant::now() < deadline
    {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
