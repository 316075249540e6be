//! Explicitly addressed dialogue.

use std::sync::Arc;

use async_trait::async_trait;
use loremaster_core::conversation::MessageRole;
use loremaster_dispatch::domain::commands::{Command, CommandKind};
use loremaster_narrator::domain::role::NarratorRole;
use loremaster_narrator::domain::tools::ToolScope;
use tracing::{debug, info, warn};

use crate::application::invoke::{Invocation, invoke};
use crate::application::services::EngineServices;
use crate::application::step::{HaltReason, Step, StepOutcome};
use crate::domain::context::OrchestrationContext;
use crate::domain::routing::detect_dialogue_targets;
use crate::error::OrchestrationError;

/// Finds the characters an input explicitly addresses. Skipped in combat.
#[derive(Debug, Default)]
pub struct DetectDialogueStep;

#[async_trait]
impl Step for DetectDialogueStep {
    fn name(&self) -> &'static str {
        "detect_dialogue"
    }

    async fn run(
        &self,
        ctx: OrchestrationContext,
    ) -> Result<(OrchestrationContext, StepOutcome), OrchestrationError> {
        if ctx.session.combat.is_active {
            return Ok((ctx.with_dialogue_targets(Vec::new()), StepOutcome::Continue));
        }
        let targets = detect_dialogue_targets(&ctx.input, &ctx.session);
        debug!(session_id = %ctx.session_id, targets = targets.len(), "dialogue targets detected");
        Ok((ctx.with_dialogue_targets(targets), StepOutcome::Continue))
    }
}

/// Pins, refreshes, or releases the dialogue session.
#[derive(Debug)]
pub struct DialogueSessionStep {
    services: Arc<EngineServices>,
}

impl DialogueSessionStep {
    /// Creates the step.
    #[must_use]
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Step for DialogueSessionStep {
    fn name(&self) -> &'static str {
        "dialogue_session"
    }

    async fn run(
        &self,
        ctx: OrchestrationContext,
    ) -> Result<(OrchestrationContext, StepOutcome), OrchestrationError> {
        if ctx.session.combat.is_active {
            return Ok((ctx, StepOutcome::Continue));
        }
        let kind = if !ctx.dialogue_targets.is_empty() {
            CommandKind::BeginDialogue {
                targets: ctx.dialogue_targets.clone(),
            }
        } else if ctx.session.dialogue.is_some() {
            CommandKind::EndDialogue
        } else {
            return Ok((ctx, StepOutcome::Continue));
        };

        self.services
            .dispatcher
            .execute(Command::new(ctx.session_id, kind))
            .await?;
        let session = self.services.reload(ctx.session_id).await?;
        Ok((ctx.with_session(session), StepOutcome::Continue))
    }
}

/// Lets each addressed character answer, then halts the pipeline.
///
/// A character's narrator failing produces an error event and does not
/// stop the others.
#[derive(Debug)]
pub struct ExecuteDialogueStep {
    services: Arc<EngineServices>,
}

impl ExecuteDialogueStep {
    /// Creates the step.
    #[must_use]
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Step for ExecuteDialogueStep {
    fn name(&self) -> &'static str {
        "execute_dialogue"
    }

    async fn run(
        &self,
        ctx: OrchestrationContext,
    ) -> Result<(OrchestrationContext, StepOutcome), OrchestrationError> {
        if ctx.dialogue_targets.is_empty() || ctx.session.combat.is_active {
            return Ok((ctx, StepOutcome::Continue));
        }
        let services = &self.services;
        let player_name = ctx.session.character(&ctx.session.player_id)?.name.clone();
        services
            .record(ctx.session_id, &player_name, MessageRole::Player, &ctx.input)
            .await?;

        let session_id = ctx.session_id;
        let targets = ctx.dialogue_targets.clone();
        let mut ctx = ctx;
        for target in &targets {
            ctx = ctx.with_session(services.reload(session_id).await?);
            let character = ctx.session.character(target)?.clone();
            let cached = services.cache.narrator_for(ctx.session_id, &character);
            let output = invoke(
                services,
                cached.narrator.as_ref(),
                &ctx.session,
                Invocation {
                    role: NarratorRole::Dialogue,
                    speaker: character.name.clone(),
                    input: ctx.input.clone(),
                    persona: cached.persona,
                    context: services
                        .context_builder
                        .render(&ctx.session, NarratorRole::Dialogue),
                    scope: ToolScope::for_role(NarratorRole::Dialogue),
                    stream_chunks: true,
                    record_as: Some(MessageRole::Npc),
                },
            )
            .await?;
            if output.failure.is_some() {
                warn!(session_id = %ctx.session_id, character = %target, "dialogue narrator failed");
            }
            ctx = ctx.with_events(output.events);
        }

        let session = services.reload(ctx.session_id).await?;
        info!(session_id = %ctx.session_id, targets = targets.len(), "dialogue handled");
        Ok((
            ctx.with_session(session),
            StepOutcome::Halt(HaltReason::DialogueHandled { targets }),
        ))
    }
}
