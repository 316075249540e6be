//! Bridges between the narrative and combat narrators.
//!
//! When control passes from one narrator to the other, recent conversation
//! is condensed into a short bridge that is recorded and broadcast before
//! the incoming narrator speaks. A summarizer that keeps failing never
//! blocks the handoff; a fixed sentence stands in for it.

use loremaster_core::conversation::MessageRole;
use loremaster_core::session::GameSession;
use loremaster_dispatch::domain::events::BroadcastKind;
use loremaster_narrator::application::narrator::{Summarizer, SummaryRequest};
use loremaster_narrator::domain::role::NarratorRole;
use tracing::{info, instrument, warn};

use super::services::EngineServices;
use crate::domain::context::TurnEvent;
use crate::error::OrchestrationError;

/// Bridge used when combat begins and no summary could be produced.
pub const COMBAT_START_FALLBACK: &str =
    "The moment shatters as weapons are drawn and the fight begins.";

/// Bridge used when combat ends and no summary could be produced.
pub const COMBAT_END_FALLBACK: &str =
    "The din of battle fades, and the world slowly comes back into focus.";

/// Speaker name recorded for bridges.
pub const TRANSITION_SPEAKER: &str = "Transition";

/// The fixed bridge for a handoff.
#[must_use]
pub fn fallback_for(to: NarratorRole) -> &'static str {
    if to == NarratorRole::Combat {
        COMBAT_START_FALLBACK
    } else {
        COMBAT_END_FALLBACK
    }
}

/// Asks the summarizer up to `attempts` times; an error or a blank summary
/// counts as a failed attempt. Falls back to `fallback`.
pub async fn summarize_with_retry(
    summarizer: &dyn Summarizer,
    request: &SummaryRequest,
    attempts: usize,
    fallback: &str,
) -> String {
    for attempt in 1..=attempts {
        match summarizer.summarize(request).await {
            Ok(summary) if !summary.trim().is_empty() => return summary.trim().to_owned(),
            Ok(_) => warn!(session_id = %request.session_id, attempt, "summarizer returned nothing"),
            Err(err) => warn!(session_id = %request.session_id, attempt, error = %err, "summarizer failed"),
        }
    }
    warn!(session_id = %request.session_id, attempts, "using fallback bridge");
    fallback.to_owned()
}

/// Produces, records, and broadcasts the bridge for a handoff.
///
/// # Errors
///
/// Returns an error if the bridge cannot be recorded.
#[instrument(skip_all, fields(session_id = %session.id, %from, %to))]
pub async fn bridge(
    services: &EngineServices,
    session: &GameSession,
    from: NarratorRole,
    to: NarratorRole,
) -> Result<TurnEvent, OrchestrationError> {
    let request = SummaryRequest {
        session_id: session.id,
        from,
        to,
        messages: session
            .recent_messages(services.config.summary_window)
            .to_vec(),
    };
    let summary = summarize_with_retry(
        services.summarizer.as_ref(),
        &request,
        services.config.summary_attempts,
        fallback_for(to),
    )
    .await;

    services
        .record(session.id, TRANSITION_SPEAKER, MessageRole::System, &summary)
        .await?;
    services.broadcast(
        session.id,
        BroadcastKind::System {
            message: summary.clone(),
        },
    );
    info!(session_id = %session.id, %from, %to, "narrator handoff bridged");

    Ok(TurnEvent::Transition { from, to, summary })
}
