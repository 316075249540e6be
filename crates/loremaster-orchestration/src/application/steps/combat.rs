//! Narrative/combat handoffs and the auto-continuation step.

use std::sync::Arc;

use async_trait::async_trait;
use loremaster_combat::domain::prompts::roster;
use loremaster_narrator::domain::role::NarratorRole;
use tracing::info;

use crate::application::combat_loop::{LoopStop, run_auto_continuation};
use crate::application::invoke::{Invocation, invoke};
use crate::application::services::EngineServices;
use crate::application::step::{HaltReason, Step, StepOutcome};
use crate::application::transition::bridge;
use crate::domain::context::OrchestrationContext;
use crate::error::OrchestrationError;

async fn handoff(
    services: &EngineServices,
    ctx: OrchestrationContext,
    from: NarratorRole,
    to: NarratorRole,
    prompt: String,
) -> Result<OrchestrationContext, OrchestrationError> {
    let event = bridge(services, &ctx.session, from, to).await?;
    let session = services.reload(ctx.session_id).await?;
    let ctx = ctx.with_event(event).with_session(session);

    let narrator = match to {
        NarratorRole::Combat => &services.narrators.combat,
        _ => &services.narrators.narrative,
    };
    let context = services.context_builder.render(&ctx.session, to);
    let output = invoke(
        services,
        narrator.as_ref(),
        &ctx.session,
        Invocation::standard(to, prompt, context),
    )
    .await?
    .into_result(to)?;

    let session = services.reload(ctx.session_id).await?;
    Ok(ctx.with_events(output.events).with_session(session))
}

/// Hands control to the combat narrator when combat began this input.
#[derive(Debug)]
pub struct EnterCombatStep {
    services: Arc<EngineServices>,
}

impl EnterCombatStep {
    /// Creates the step.
    #[must_use]
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Step for EnterCombatStep {
    fn name(&self) -> &'static str {
        "enter_combat"
    }

    async fn run(
        &self,
        ctx: OrchestrationContext,
    ) -> Result<(OrchestrationContext, StepOutcome), OrchestrationError> {
        if !(ctx.combat_entered && ctx.session.combat.is_active) {
            return Ok((ctx, StepOutcome::Continue));
        }
        info!(session_id = %ctx.session_id, "combat started; handing off to combat narrator");
        let prompt = format!(
            "Combat has begun. Describe the opening moment in a few sentences \
             without resolving any turn.\n{}",
            roster(&ctx.session)
        );
        let ctx = handoff(
            &self.services,
            ctx,
            NarratorRole::Narrative,
            NarratorRole::Combat,
            prompt,
        )
        .await?;
        Ok((ctx, StepOutcome::Continue))
    }
}

/// Resolves non-player turns while combat is active. Halts when an ally's
/// turn needs the player's decision.
#[derive(Debug)]
pub struct CombatLoopStep {
    services: Arc<EngineServices>,
}

impl CombatLoopStep {
    /// Creates the step.
    #[must_use]
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Step for CombatLoopStep {
    fn name(&self) -> &'static str {
        "combat_loop"
    }

    async fn run(
        &self,
        ctx: OrchestrationContext,
    ) -> Result<(OrchestrationContext, StepOutcome), OrchestrationError> {
        if !ctx.session.combat.is_active {
            return Ok((ctx, StepOutcome::Continue));
        }
        let (ctx, exit) = run_auto_continuation(&self.services, ctx).await?;
        info!(
            session_id = %ctx.session_id,
            iterations = exit.iterations,
            stop = ?exit.stop,
            "auto-continuation finished"
        );
        let outcome = match exit.stop {
            LoopStop::AllyDecision(entity_id) => {
                StepOutcome::Halt(HaltReason::AllyDecision { entity_id })
            }
            _ => StepOutcome::Continue,
        };
        Ok((ctx, outcome))
    }
}

/// Hands control back to the narrative narrator when combat ended this
/// input.
#[derive(Debug)]
pub struct LeaveCombatStep {
    services: Arc<EngineServices>,
}

impl LeaveCombatStep {
    /// Creates the step.
    #[must_use]
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Step for LeaveCombatStep {
    fn name(&self) -> &'static str {
        "leave_combat"
    }

    async fn run(
        &self,
        ctx: OrchestrationContext,
    ) -> Result<(OrchestrationContext, StepOutcome), OrchestrationError> {
        if !ctx.combat_ended() {
            return Ok((ctx, StepOutcome::Continue));
        }
        info!(session_id = %ctx.session_id, "combat ended; handing back to narrative narrator");
        let prompt = "The fight is over. Describe the aftermath and what the party \
                      notices now that the dust settles."
            .to_owned();
        let ctx = handoff(
            &self.services,
            ctx,
            NarratorRole::Combat,
            NarratorRole::Narrative,
            prompt,
        )
        .await?;
        Ok((ctx, StepOutcome::Continue))
    }
}
