//! Loremaster — Combat Turn Scheduler.
//!
//! Reads a session's combat state to decide what the next turn needs (an
//! automatic combat-narrator turn, an ally suggestion, the player, or an
//! end-of-combat prompt) and wraps the combat commands it issues through
//! the dispatcher. The loop that acts on these decisions lives in the
//! orchestration pipeline.

pub mod application;
pub mod domain;
