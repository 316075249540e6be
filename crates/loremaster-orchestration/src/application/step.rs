//! Pipeline steps and the runner that threads a context through them.

use std::sync::Arc;

use async_trait::async_trait;
use loremaster_core::ids::EntityId;
use tracing::{debug, info, instrument};

use crate::domain::context::OrchestrationContext;
use crate::error::OrchestrationError;

/// Why a step stopped the pipeline early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// Explicitly addressed characters answered the input.
    DialogueHandled {
        /// Characters that answered.
        targets: Vec<EntityId>,
    },
    /// An ally's turn awaits the player's decision.
    AllyDecision {
        /// The ally.
        entity_id: EntityId,
    },
}

/// What the pipeline does after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Run the next step.
    Continue,
    /// Skip every remaining step.
    Halt(HaltReason),
}

/// One stage of input processing.
#[async_trait]
pub trait Step: Send + Sync {
    /// Name used in logs and run reports.
    fn name(&self) -> &'static str;

    /// Consumes a context and returns the next one.
    ///
    /// # Errors
    ///
    /// Returns an error to abort the run.
    async fn run(
        &self,
        ctx: OrchestrationContext,
    ) -> Result<(OrchestrationContext, StepOutcome), OrchestrationError>;
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct PipelineRun {
    /// Final context.
    pub context: OrchestrationContext,
    /// Why the run stopped early, if it did.
    pub halted: Option<HaltReason>,
    /// Steps that ran, in order.
    pub executed: Vec<&'static str>,
}

/// An ordered list of steps.
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn Step>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .finish()
    }
}

impl Pipeline {
    /// An empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    #[must_use]
    pub fn with_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs the steps in order until one halts or fails.
    ///
    /// # Errors
    ///
    /// Returns the first step error; later steps do not run.
    #[instrument(skip(self, ctx), fields(session_id = %ctx.session_id))]
    pub async fn run(&self, ctx: OrchestrationContext) -> Result<PipelineRun, OrchestrationError> {
        let mut ctx = ctx;
        let mut executed = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            debug!(step = step.name(), "running step");
            executed.push(step.name());
            let (next, outcome) = step.run(ctx).await?;
            ctx = next;
            if let StepOutcome::Halt(reason) = outcome {
                info!(step = step.name(), ?reason, "pipeline halted");
                return Ok(PipelineRun {
                    context: ctx,
                    halted: Some(reason),
                    executed,
                });
            }
        }
        Ok(PipelineRun {
            context: ctx,
            halted: None,
            executed,
        })
    }
}
