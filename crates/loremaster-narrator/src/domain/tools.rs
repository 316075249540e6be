//! Tool catalog and capability scopes.
//!
//! Tool names coincide with the serde tags of the matching `CommandKind`, so
//! a tool call translates into exactly one command by tagging its argument
//! object.

use std::collections::BTreeSet;
use std::fmt;

use loremaster_dispatch::domain::commands::CommandKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::role::NarratorRole;

/// Operations a narrator may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    ApplyHpDelta,
    RollDice,
    AddItem,
    RemoveItem,
    AdvanceTime,
    MoveParty,
    StartCombat,
    NextTurn,
    RemoveParticipant,
    EndCombat,
    StartQuest,
    UpdateQuest,
    AddPartyMember,
    RemovePartyMember,
}

impl Tool {
    /// The full catalog.
    pub const ALL: [Self; 14] = [
        Self::ApplyHpDelta,
        Self::RollDice,
        Self::AddItem,
        Self::RemoveItem,
        Self::AdvanceTime,
        Self::MoveParty,
        Self::StartCombat,
        Self::NextTurn,
        Self::RemoveParticipant,
        Self::EndCombat,
        Self::StartQuest,
        Self::UpdateQuest,
        Self::AddPartyMember,
        Self::RemovePartyMember,
    ];

    /// The name a narrator uses to call the tool.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ApplyHpDelta => "apply_hp_delta",
            Self::RollDice => "roll_dice",
            Self::AddItem => "add_item",
            Self::RemoveItem => "remove_item",
            Self::AdvanceTime => "advance_time",
            Self::MoveParty => "move_party",
            Self::StartCombat => "start_combat",
            Self::NextTurn => "next_turn",
            Self::RemoveParticipant => "remove_participant",
            Self::EndCombat => "end_combat",
            Self::StartQuest => "start_quest",
            Self::UpdateQuest => "update_quest",
            Self::AddPartyMember => "add_party_member",
            Self::RemovePartyMember => "remove_party_member",
        }
    }

    /// Looks a tool up by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Builds the command for this tool from a JSON argument object.
    ///
    /// # Errors
    ///
    /// Returns a message describing why the arguments do not fit the tool.
    pub fn command(self, arguments: &Value) -> Result<CommandKind, String> {
        let mut object = match arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => return Err(format!("{} expects an object, got {other}", self.name())),
        };
        object.insert("type".to_owned(), Value::String(self.name().to_owned()));
        serde_json::from_value(Value::Object(object))
            .map_err(|err| format!("invalid arguments for {}: {err}", self.name()))
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of tools a narrator may call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolScope {
    tools: BTreeSet<Tool>,
}

impl ToolScope {
    /// A scope that allows nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A scope over exactly the given tools.
    #[must_use]
    pub fn of(tools: impl IntoIterator<Item = Tool>) -> Self {
        Self {
            tools: tools.into_iter().collect(),
        }
    }

    /// The scope granted to a narrator role.
    ///
    /// Only the combat narrator drives the turn order; only the narrative
    /// narrator starts fights or moves the world on. Ally suggestions get no
    /// tools at all.
    #[must_use]
    pub fn for_role(role: NarratorRole) -> Self {
        use Tool::{
            AddItem, AddPartyMember, AdvanceTime, ApplyHpDelta, EndCombat, MoveParty, NextTurn,
            RemoveItem, RemoveParticipant, RemovePartyMember, RollDice, StartCombat, StartQuest,
            UpdateQuest,
        };
        match role {
            NarratorRole::Narrative => Self::of([
                ApplyHpDelta,
                RollDice,
                AddItem,
                RemoveItem,
                AdvanceTime,
                MoveParty,
                StartCombat,
                StartQuest,
                UpdateQuest,
                AddPartyMember,
                RemovePartyMember,
            ]),
            NarratorRole::Combat => Self::of([
                ApplyHpDelta,
                RollDice,
                AddItem,
                RemoveItem,
                NextTurn,
                RemoveParticipant,
                EndCombat,
            ]),
            NarratorRole::Dialogue => Self::of([
                RollDice,
                AddItem,
                RemoveItem,
                StartQuest,
                UpdateQuest,
                AddPartyMember,
                RemovePartyMember,
            ]),
            NarratorRole::AllySuggestion => Self::empty(),
        }
    }

    /// Whether the scope includes `tool`.
    #[must_use]
    pub fn allows(&self, tool: Tool) -> bool {
        self.tools.contains(&tool)
    }

    /// Allowed tools in catalog order.
    pub fn tools(&self) -> impl Iterator<Item = Tool> + '_ {
        self.tools.iter().copied()
    }

    /// Whether nothing is allowed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// A narrator's request to run a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name as the narrator spelled it.
    pub name: String,
    /// Structured arguments.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// Creates a call.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// What the narrator gets back from a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    /// The command ran; `result` is the serialized `CommandResult`.
    Ok {
        /// Tool name.
        tool: String,
        /// Structured result.
        result: Value,
        /// Results of commands the tool's command triggered.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        triggered: Vec<Value>,
    },
    /// The call was refused before dispatch.
    Blocked {
        /// Tool name.
        tool: String,
        /// Why it was refused.
        reason: String,
    },
    /// The command was dispatched and failed, or its arguments were invalid.
    Failed {
        /// Tool name.
        tool: String,
        /// Human-readable failure.
        error: String,
    },
}

impl ToolResult {
    /// Whether the call took effect.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Whether the call was refused by scope.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    /// Structured form handed back to the narrator.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
