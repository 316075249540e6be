//! Loremaster — Command Dispatcher.
//!
//! Narrator tool calls become `Command` values. The dispatcher routes each
//! one, by category tag only, to the single handler registered for that
//! category and runs it on a per-session FIFO lane.

pub mod application;
pub mod domain;
pub mod error;
