//! Tool runtime: narrator tool calls become dispatcher commands.

use loremaster_dispatch::application::dispatcher::Dispatcher;
use loremaster_dispatch::domain::commands::{Command, CommandKind};
use loremaster_dispatch::domain::events::BroadcastKind;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::tools::{Tool, ToolCall, ToolResult, ToolScope};

/// Executes a narrator's tool calls against one session, within one scope.
///
/// Each permitted call becomes exactly one command. The call and its result
/// are broadcast on the session stream, and the command (with anything it
/// triggers) has finished before `invoke` returns.
#[derive(Debug, Clone)]
pub struct ToolRuntime {
    dispatcher: Dispatcher,
    session_id: Uuid,
    scope: ToolScope,
}

impl ToolRuntime {
    /// Creates a runtime bound to a session and scope.
    #[must_use]
    pub fn new(dispatcher: Dispatcher, session_id: Uuid, scope: ToolScope) -> Self {
        Self {
            dispatcher,
            session_id,
            scope,
        }
    }

    /// The tools this runtime permits.
    #[must_use]
    pub fn scope(&self) -> &ToolScope {
        &self.scope
    }

    /// Runs one tool call.
    ///
    /// Out-of-scope and unknown tools are refused before anything is
    /// dispatched. Command failures come back as `ToolResult::Failed` so the
    /// narrator can react.
    #[instrument(skip(self, call), fields(session_id = %self.session_id, tool = %call.name))]
    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = Tool::from_name(&call.name) else {
            warn!("unknown tool requested");
            return ToolResult::Blocked {
                tool: call.name.clone(),
                reason: format!("unknown tool {}", call.name),
            };
        };
        if !self.scope.allows(tool) {
            warn!("tool outside narrator scope blocked");
            return ToolResult::Blocked {
                tool: call.name.clone(),
                reason: format!("{tool} is not available to this narrator"),
            };
        }

        let kind = match tool.command(&call.arguments) {
            Ok(kind) => kind,
            Err(error) => {
                warn!(%error, "tool arguments rejected");
                return ToolResult::Failed {
                    tool: call.name.clone(),
                    error,
                };
            }
        };

        self.announce(BroadcastKind::ToolCall {
            tool: call.name.clone(),
            arguments: call.arguments.clone(),
        });
        let result = self.run(tool, kind).await;
        self.announce(BroadcastKind::ToolResult {
            tool: call.name.clone(),
            result: result.to_json(),
        });
        result
    }

    async fn run(&self, tool: Tool, kind: CommandKind) -> ToolResult {
        let command = Command::new(self.session_id, kind);
        let correlation_id = command.correlation_id;
        let failed = |error: String| ToolResult::Failed {
            tool: tool.name().to_owned(),
            error,
        };

        let report = match self.dispatcher.submit_and_wait(vec![command]).await {
            Ok(report) => report,
            Err(err) => return failed(err.to_string()),
        };

        let mut triggered = Vec::new();
        for outcome in report.outcomes().iter().skip(1) {
            match &outcome.result {
                Ok(result) => triggered.push(serde_json::to_value(result).unwrap_or(Value::Null)),
                Err(err) => warn!(
                    %correlation_id,
                    command_type = outcome.command_type,
                    error = %err,
                    "triggered command failed"
                ),
            }
        }

        match report.result_for(correlation_id) {
            Some(Ok(result)) => {
                debug!(%correlation_id, "tool call applied");
                ToolResult::Ok {
                    tool: tool.name().to_owned(),
                    result: serde_json::to_value(result).unwrap_or(Value::Null),
                    triggered,
                }
            }
            Some(Err(err)) => {
                warn!(%correlation_id, error = %err, "tool command failed");
                failed(err.to_string())
            }
            None => failed("no outcome recorded".to_owned()),
        }
    }

    fn announce(&self, kind: BroadcastKind) {
        let command = Command::new(self.session_id, CommandKind::Broadcast { kind });
        if let Err(err) = self.dispatcher.submit(vec![command]) {
            warn!(error = %err, "tool broadcast not submitted");
        }
    }
}
