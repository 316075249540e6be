//! Loremaster Core — shared domain abstractions.
//!
//! This crate defines the session aggregate that every other crate reads and
//! that command handlers mutate, plus the small seams (clock, RNG, store) that
//! keep the engine deterministic under test. It contains no orchestration
//! logic.

pub mod clock;
pub mod combat;
pub mod conversation;
pub mod dialogue;
pub mod error;
pub mod ids;
pub mod repository;
pub mod rng;
pub mod session;
