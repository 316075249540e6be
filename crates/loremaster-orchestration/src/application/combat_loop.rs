//! Combat auto-continuation.
//!
//! After the combat narrator acts, non-player turns keep resolving without
//! player input until the turn comes back to a human: the player, or an
//! ally whose suggested action the player must approve. A hard ceiling on
//! iterations bounds a narrator that never advances the turn.

use loremaster_combat::domain::phase::{TurnDecision, TurnMarker};
use loremaster_core::error::DomainError;
use loremaster_core::ids::EntityId;
use loremaster_dispatch::domain::events::BroadcastKind;
use loremaster_narrator::domain::role::NarratorRole;
use loremaster_narrator::domain::tools::ToolScope;
use tracing::{info, instrument, warn};

use super::invoke::{Invocation, invoke};
use super::services::EngineServices;
use crate::domain::context::{OrchestrationContext, TurnEvent};
use crate::error::OrchestrationError;

/// Suggestion offered when an ally's narrator fails or stays silent.
#[must_use]
pub fn fallback_suggestion(ally_name: &str) -> String {
    format!("{ally_name} awaits your command.")
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// Combat is not running.
    Inactive,
    /// The player holds the turn.
    PlayerTurn,
    /// An ally's suggestion awaits the player.
    AllyDecision(EntityId),
    /// The combat narrator was asked to close the encounter.
    EndPrompted,
    /// The iteration ceiling was reached with combat still active.
    CapReached,
}

/// How a loop run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopExit {
    /// Narrator invocations made.
    pub iterations: usize,
    /// Why the loop stopped.
    pub stop: LoopStop,
}

/// Resolves non-player combat turns until a human must act.
///
/// Every iteration reloads the session before deciding. A failure of the
/// combat narrator aborts the loop.
///
/// # Errors
///
/// Returns `NarratorFailed` if the combat narrator fails, or a domain or
/// dispatch error if the session cannot be read or written.
#[instrument(skip(services, ctx), fields(session_id = %ctx.session_id))]
pub async fn run_auto_continuation(
    services: &EngineServices,
    ctx: OrchestrationContext,
) -> Result<(OrchestrationContext, LoopExit), OrchestrationError> {
    let ceiling = services.config.max_auto_iterations;
    let session_id = ctx.session_id;
    let mut ctx = ctx;
    let mut last: Option<TurnMarker> = None;
    let mut iterations = 0;

    while iterations < ceiling {
        ctx = ctx.with_session(services.reload(session_id).await?);
        let exit = move |stop| LoopExit { iterations, stop };

        match services.scheduler.next_decision(&ctx.session) {
            TurnDecision::Inactive => return Ok((ctx, exit(LoopStop::Inactive))),
            TurnDecision::PlayerTurn(_) => return Ok((ctx, exit(LoopStop::PlayerTurn))),
            TurnDecision::EndCombat => {
                let prompt = services.scheduler.end_prompt(&ctx.session);
                ctx = combat_turn(services, ctx, prompt).await?;
                iterations += 1;
                ctx = ctx.with_session(services.reload(session_id).await?);
                info!(iterations, "combat narrator asked to close the encounter");
                return Ok((
                    ctx,
                    LoopExit {
                        iterations,
                        stop: LoopStop::EndPrompted,
                    },
                ));
            }
            TurnDecision::AllySuggestion(ally) => {
                ctx = suggest_for_ally(services, ctx, &ally.entity_id).await?;
                iterations += 1;
                return Ok((
                    ctx,
                    LoopExit {
                        iterations,
                        stop: LoopStop::AllyDecision(ally.entity_id),
                    },
                ));
            }
            TurnDecision::NpcTurn(_) => {
                let marker = TurnMarker::current(&ctx.session);
                let prompt = services.scheduler.turn_prompt(&ctx.session, last.as_ref());
                ctx = combat_turn(services, ctx, prompt).await?;
                iterations += 1;
                last = marker;
            }
        }
    }

    warn!(
        iterations,
        "auto-continuation ceiling reached; leaving combat active"
    );
    ctx = ctx.with_session(services.reload(session_id).await?);
    let ctx = ctx.with_event(TurnEvent::LoopCapReached { iterations });
    Ok((
        ctx,
        LoopExit {
            iterations,
            stop: LoopStop::CapReached,
        },
    ))
}

async fn combat_turn(
    services: &EngineServices,
    ctx: OrchestrationContext,
    prompt: String,
) -> Result<OrchestrationContext, OrchestrationError> {
    let context = services
        .context_builder
        .render(&ctx.session, NarratorRole::Combat);
    let output = invoke(
        services,
        services.narrators.combat.as_ref(),
        &ctx.session,
        Invocation::standard(NarratorRole::Combat, prompt, context),
    )
    .await?;
    let failure = output.failure.clone();
    let ctx = ctx.with_events(output.events);
    match failure {
        Some(message) => Err(OrchestrationError::NarratorFailed {
            role: NarratorRole::Combat,
            message,
        }),
        None => Ok(ctx),
    }
}

/// Asks the ally's own narrator for a proposed action. The narrator gets
/// no tools and nothing is recorded; the proposal goes out as a single
/// suggestion event for the player to accept or override.
async fn suggest_for_ally(
    services: &EngineServices,
    ctx: OrchestrationContext,
    ally_id: &EntityId,
) -> Result<OrchestrationContext, OrchestrationError> {
    let ally = ctx.session.character(ally_id)?.clone();
    let participant = ctx
        .session
        .combat
        .participant(ally_id)
        .cloned()
        .ok_or_else(|| DomainError::EntityNotFound(ally_id.clone()))?;
    let cached = services.cache.narrator_for(ctx.session_id, &ally);
    let prompt = services
        .scheduler
        .ally_suggestion_prompt(&ctx.session, &participant);

    let output = invoke(
        services,
        cached.narrator.as_ref(),
        &ctx.session,
        Invocation {
            role: NarratorRole::AllySuggestion,
            speaker: ally.name.clone(),
            input: prompt,
            persona: cached.persona,
            context: services
                .context_builder
                .render(&ctx.session, NarratorRole::AllySuggestion),
            scope: ToolScope::empty(),
            stream_chunks: false,
            record_as: None,
        },
    )
    .await?;

    let text = output.text.trim();
    let suggestion = if output.failure.is_none() && !text.is_empty() {
        text.to_owned()
    } else {
        warn!(ally = %ally_id, "ally produced no suggestion; offering the fallback");
        fallback_suggestion(&ally.name)
    };
    services.broadcast(
        ctx.session_id,
        BroadcastKind::Suggestion {
            entity_id: ally_id.clone(),
            suggestion: suggestion.clone(),
        },
    );
    info!(ally = %ally_id, "ally suggestion awaiting player decision");
    Ok(ctx
        .with_events(output.events)
        .with_event(TurnEvent::Suggestion {
            entity_id: ally_id.clone(),
            text: suggestion,
        }))
}
