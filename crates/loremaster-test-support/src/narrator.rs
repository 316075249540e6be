//! Scripted narrators.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use loremaster_narrator::application::narrator::Narrator;
use loremaster_narrator::domain::request::NarratorRequest;
use loremaster_narrator::domain::role::NarratorRole;
use loremaster_narrator::domain::stream::{NarratorStream, StreamEvent};
use loremaster_narrator::domain::tools::{Tool, ToolCall, ToolResult};
use loremaster_narrator::error::NarratorError;
use serde_json::{Value, json};

/// One step of a scripted turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptAction {
    /// Emit a text chunk.
    Say(String),
    /// Emit a thinking event.
    Think(String),
    /// Invoke a tool through the request's runtime.
    Call(ToolCall),
    /// Emit an error event and stop.
    Fail(String),
}

impl ScriptAction {
    /// Shorthand for `Say`.
    #[must_use]
    pub fn say(text: &str) -> Self {
        Self::Say(text.to_owned())
    }

    /// Shorthand for `Call`.
    #[must_use]
    pub fn call(tool: &str, arguments: Value) -> Self {
        Self::Call(ToolCall::new(tool, arguments))
    }
}

/// What a scripted narrator saw on one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Role of the invocation.
    pub role: NarratorRole,
    /// Input text.
    pub input: String,
    /// Persona block, if any.
    pub persona: Option<String>,
    /// Working context.
    pub context: String,
    /// Tools the runtime allowed.
    pub tools: Vec<Tool>,
}

#[derive(Debug, Default)]
struct State {
    turns: VecDeque<Vec<ScriptAction>>,
    requests: Vec<RecordedRequest>,
    tool_results: Vec<ToolResult>,
}

/// A narrator that plays back scripted turns.
///
/// Each invocation consumes the next scripted turn; once the script runs
/// out, every further invocation plays the fallback turn.
#[derive(Debug)]
pub struct ScriptedNarrator {
    fallback: Vec<ScriptAction>,
    refuse: Option<String>,
    state: Mutex<State>,
}

impl ScriptedNarrator {
    /// A narrator whose every turn is a single line of text.
    #[must_use]
    pub fn new(fallback_line: &str) -> Self {
        Self::repeating(vec![ScriptAction::say(fallback_line)])
    }

    /// A narrator that plays the same turn forever.
    #[must_use]
    pub fn repeating(fallback: Vec<ScriptAction>) -> Self {
        Self {
            fallback,
            refuse: None,
            state: Mutex::new(State::default()),
        }
    }

    /// A narrator whose `process` always fails.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            fallback: Vec::new(),
            refuse: Some(message.to_owned()),
            state: Mutex::new(State::default()),
        }
    }

    /// Queues a scripted turn.
    #[must_use]
    pub fn turn(self, actions: Vec<ScriptAction>) -> Self {
        self.lock().turns.push_back(actions);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of invocations so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.lock().requests.len()
    }

    /// Every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Every tool result received, in order.
    #[must_use]
    pub fn tool_results(&self) -> Vec<ToolResult> {
        self.lock().tool_results.clone()
    }
}

#[async_trait]
impl Narrator for ScriptedNarrator {
    async fn process(&self, request: NarratorRequest) -> Result<NarratorStream, NarratorError> {
        let actions = {
            let mut state = self.lock();
            state.requests.push(RecordedRequest {
                role: request.role,
                input: request.input.clone(),
                persona: request.persona.clone(),
                context: request.context.clone(),
                tools: request.tools.scope().tools().collect(),
            });
            if let Some(message) = &self.refuse {
                return Err(NarratorError::Generation(message.clone()));
            }
            state
                .turns
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        };

        let mut events = Vec::new();
        let mut calls = 0;
        for action in actions {
            match action {
                ScriptAction::Say(text) => events.push(StreamEvent::Chunk(text)),
                ScriptAction::Think(text) => events.push(StreamEvent::Thinking(text)),
                ScriptAction::Call(call) => {
                    let result = request.tools.invoke(&call).await;
                    calls += 1;
                    self.lock().tool_results.push(result);
                }
                ScriptAction::Fail(message) => {
                    events.push(StreamEvent::Error(message));
                    return Ok(NarratorStream::from_events(events));
                }
            }
        }
        events.push(StreamEvent::Complete(json!({ "tool_calls": calls })));
        Ok(NarratorStream::from_events(events))
    }
}
