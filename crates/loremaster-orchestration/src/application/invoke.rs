//! Drives one narrator invocation to completion.

use loremaster_core::conversation::MessageRole;
use loremaster_core::session::GameSession;
use loremaster_dispatch::domain::events::BroadcastKind;
use loremaster_narrator::application::narrator::Narrator;
use loremaster_narrator::application::runtime::ToolRuntime;
use loremaster_narrator::domain::request::NarratorRequest;
use loremaster_narrator::domain::role::NarratorRole;
use loremaster_narrator::domain::stream::StreamEvent;
use loremaster_narrator::domain::tools::ToolScope;
use tracing::{debug, error};

use super::services::EngineServices;
use crate::domain::context::TurnEvent;
use crate::error::OrchestrationError;

pub(crate) struct Invocation {
    pub role: NarratorRole,
    pub speaker: String,
    pub input: String,
    pub persona: Option<String>,
    pub context: String,
    pub scope: ToolScope,
    /// Publish chunks as `NarrativeChunk` broadcasts.
    pub stream_chunks: bool,
    /// Record the full text in the conversation under this role.
    pub record_as: Option<MessageRole>,
}

impl Invocation {
    /// A session narrator invocation: streams, records, and uses the role's
    /// standard tool scope.
    pub fn standard(role: NarratorRole, input: String, context: String) -> Self {
        let (speaker, record_as) = match role {
            NarratorRole::Combat => ("Combat Narrator", MessageRole::Combat),
            _ => ("Narrator", MessageRole::Narrator),
        };
        Self {
            role,
            speaker: speaker.to_owned(),
            input,
            persona: None,
            context,
            scope: ToolScope::for_role(role),
            stream_chunks: true,
            record_as: Some(record_as),
        }
    }
}

pub(crate) struct InvocationOutput {
    pub events: Vec<TurnEvent>,
    pub text: String,
    pub failure: Option<String>,
}

impl InvocationOutput {
    /// Turns a failed invocation into `NarratorFailed`.
    pub fn into_result(self, role: NarratorRole) -> Result<Self, OrchestrationError> {
        match &self.failure {
            Some(message) => Err(OrchestrationError::NarratorFailed {
                role,
                message: message.clone(),
            }),
            None => Ok(self),
        }
    }
}

/// Runs `narrator` against `session`, forwarding its stream to the
/// session's subscribers. A narrator failure becomes an `Error` event and
/// is reported in `failure`; it never aborts the drain.
pub(crate) async fn invoke(
    services: &EngineServices,
    narrator: &dyn Narrator,
    session: &GameSession,
    invocation: Invocation,
) -> Result<InvocationOutput, OrchestrationError> {
    let session_id = session.id;
    let tools = ToolRuntime::new(services.dispatcher.clone(), session_id, invocation.scope);
    let request = NarratorRequest {
        session_id,
        role: invocation.role,
        input: invocation.input,
        persona: invocation.persona,
        context: invocation.context,
        session: session.clone(),
        tools,
    };

    let mut output = InvocationOutput {
        events: Vec::new(),
        text: String::new(),
        failure: None,
    };
    let narrator_event = |event: StreamEvent| TurnEvent::Narrator {
        role: invocation.role,
        speaker: invocation.speaker.clone(),
        event,
    };

    match narrator.process(request).await {
        Ok(mut stream) => {
            while let Some(event) = stream.next().await {
                match &event {
                    StreamEvent::Chunk(text) => {
                        output.text.push_str(text);
                        if invocation.stream_chunks {
                            services.broadcast(
                                session_id,
                                BroadcastKind::NarrativeChunk {
                                    speaker: invocation.speaker.clone(),
                                    content: text.clone(),
                                },
                            );
                        }
                    }
                    StreamEvent::Error(message) => output.failure = Some(message.clone()),
                    StreamEvent::Thinking(_) | StreamEvent::Complete(_) => {}
                }
                output.events.push(narrator_event(event));
            }
        }
        Err(err) => {
            let message = err.to_string();
            output.events.push(narrator_event(StreamEvent::Error(message.clone())));
            output.failure = Some(message);
        }
    }

    if let Some(message) = &output.failure {
        error!(
            %session_id,
            role = %invocation.role,
            speaker = %invocation.speaker,
            error = %message,
            "narrator invocation failed"
        );
        services.broadcast(
            session_id,
            BroadcastKind::Error {
                message: message.clone(),
            },
        );
    }

    if let Some(role) = invocation.record_as {
        if !output.text.trim().is_empty() {
            services
                .record(session_id, &invocation.speaker, role, output.text.trim())
                .await?;
        }
    }

    debug!(
        %session_id,
        role = %invocation.role,
        events = output.events.len(),
        "narrator invocation drained"
    );
    Ok(output)
}
