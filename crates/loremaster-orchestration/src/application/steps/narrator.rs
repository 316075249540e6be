//! Narrator selection and execution.

use std::sync::Arc;

use async_trait::async_trait;
use loremaster_core::conversation::MessageRole;
use loremaster_narrator::domain::role::NarratorRole;
use loremaster_narrator::domain::tools::ToolScope;
use tracing::debug;

use crate::application::invoke::{Invocation, invoke};
use crate::application::services::EngineServices;
use crate::application::step::{Step, StepOutcome};
use crate::domain::context::OrchestrationContext;
use crate::domain::routing::suggest_tools;
use crate::error::OrchestrationError;

fn role_for(ctx: &OrchestrationContext) -> NarratorRole {
    if ctx.session.combat.is_active {
        NarratorRole::Combat
    } else {
        NarratorRole::Narrative
    }
}

fn selected(ctx: &OrchestrationContext) -> NarratorRole {
    ctx.narrator.unwrap_or_else(|| role_for(ctx))
}

/// Picks the combat narrator while combat is active, the narrative one
/// otherwise.
#[derive(Debug, Default)]
pub struct SelectNarratorStep;

#[async_trait]
impl Step for SelectNarratorStep {
    fn name(&self) -> &'static str {
        "select_narrator"
    }

    async fn run(
        &self,
        ctx: OrchestrationContext,
    ) -> Result<(OrchestrationContext, StepOutcome), OrchestrationError> {
        let role = role_for(&ctx);
        debug!(session_id = %ctx.session_id, %role, "narrator selected");
        Ok((ctx.with_narrator(role), StepOutcome::Continue))
    }
}

/// Renders the working context and appends tool hints.
#[derive(Debug)]
pub struct EnrichContextStep {
    services: Arc<EngineServices>,
}

impl EnrichContextStep {
    /// Creates the step.
    #[must_use]
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Step for EnrichContextStep {
    fn name(&self) -> &'static str {
        "enrich_context"
    }

    async fn run(
        &self,
        ctx: OrchestrationContext,
    ) -> Result<(OrchestrationContext, StepOutcome), OrchestrationError> {
        let role = selected(&ctx);
        let mut text = self.services.context_builder.render(&ctx.session, role);
        let tools = suggest_tools(&ctx.input, &ToolScope::for_role(role));
        if !tools.is_empty() {
            let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
            text.push_str("Tools that may apply: ");
            text.push_str(&names.join(", "));
            text.push('\n');
        }
        Ok((
            ctx.with_working_context(text).with_suggested_tools(tools),
            StepOutcome::Continue,
        ))
    }
}

/// Records the player's input and runs the selected narrator.
#[derive(Debug)]
pub struct ExecuteNarratorStep {
    services: Arc<EngineServices>,
}

impl ExecuteNarratorStep {
    /// Creates the step.
    #[must_use]
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Step for ExecuteNarratorStep {
    fn name(&self) -> &'static str {
        "execute_narrator"
    }

    async fn run(
        &self,
        ctx: OrchestrationContext,
    ) -> Result<(OrchestrationContext, StepOutcome), OrchestrationError> {
        let services = &self.services;
        let role = selected(&ctx);
        let player_name = ctx.session.character(&ctx.session.player_id)?.name.clone();
        services
            .record(ctx.session_id, &player_name, MessageRole::Player, &ctx.input)
            .await?;
        let session = services.reload(ctx.session_id).await?;

        let narrator = match role {
            NarratorRole::Combat => &services.narrators.combat,
            _ => &services.narrators.narrative,
        };
        let output = invoke(
            services,
            narrator.as_ref(),
            &session,
            Invocation::standard(role, ctx.input.clone(), ctx.working_context.clone()),
        )
        .await?
        .into_result(role)?;

        Ok((
            ctx.with_session(session).with_events(output.events),
            StepOutcome::Continue,
        ))
    }
}

/// Refreshes the session snapshot after narrator side effects.
#[derive(Debug)]
pub struct ReloadSessionStep {
    services: Arc<EngineServices>,
}

impl ReloadSessionStep {
    /// Creates the step.
    #[must_use]
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Step for ReloadSessionStep {
    fn name(&self) -> &'static str {
        "reload_session"
    }

    async fn run(
        &self,
        ctx: OrchestrationContext,
    ) -> Result<(OrchestrationContext, StepOutcome), OrchestrationError> {
        let session = self.services.reload(ctx.session_id).await?;
        Ok((ctx.with_session(session), StepOutcome::Continue))
    }
}
