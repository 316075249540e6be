//! Loremaster — Narrator capability.
//!
//! Narrators are interchangeable providers that turn a player input and a
//! session snapshot into a stream of events. The engine depends only on the
//! `Narrator` contract defined here, never on a concrete provider. Narrators
//! affect the session exclusively through capability-scoped tool calls,
//! which the `ToolRuntime` turns into dispatcher commands.

pub mod application;
pub mod domain;
pub mod error;
