//! Loremaster terminal entry point.
//!
//! Reads player input line by line and prints the session's broadcast
//! stream. `/remove <id>` takes a character out of the session; `/quit`
//! ends it.

use loremaster_cli::error::AppError;
use loremaster_cli::state::AppState;
use loremaster_core::ids::EntityId;
use loremaster_dispatch::domain::events::BroadcastKind;
use loremaster_orchestration::application::step::HaltReason;
use loremaster_orchestration::config::EngineConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Logs go to stderr so they do not interleave with the story.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let config = EngineConfig::from_env()?;
    tracing::info!(?config, "Starting Loremaster");

    let state = AppState::bootstrap(config).await?;
    let session_id = state.session_id;

    let mut events = state.orchestrator.subscribe(session_id);
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.kind {
                BroadcastKind::NarrativeChunk { speaker, content } => {
                    println!("{speaker}: {content}");
                }
                BroadcastKind::System { message } => println!("~ {message}"),
                BroadcastKind::Suggestion {
                    entity_id,
                    suggestion,
                } => println!("[{entity_id} suggests] {suggestion}"),
                BroadcastKind::Error { message } => println!("! {message}"),
                BroadcastKind::ToolCall { .. } | BroadcastKind::ToolResult { .. } => {}
            }
        }
    });

    println!("You stand at the Old Mill with Eldrin. Type /quit to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if let Some(id) = line.strip_prefix("/remove ") {
            let entity_id = EntityId::new(id.trim());
            match state
                .orchestrator
                .remove_character(session_id, &entity_id)
                .await
            {
                Ok(()) => println!("~ {entity_id} leaves the story."),
                Err(err) => println!("! {err}"),
            }
            continue;
        }

        match state.orchestrator.process_input(session_id, line).await {
            Ok(report) => {
                if let Some(HaltReason::AllyDecision { entity_id }) = report.halted {
                    println!("~ {entity_id} awaits your decision.");
                }
            }
            Err(err) => {
                tracing::error!(%session_id, error = %err, "turn failed");
                println!("! {err}");
            }
        }
    }

    let session = state.orchestrator.end_session(session_id).await?;
    tracing::info!(%session_id, turns = session.turn, "Session ended");
    printer.abort();
    Ok(())
}
