//! Loremaster — terminal front end.
//!
//! Wires the engine with offline narrators so a session can be played
//! from a terminal without any model behind it.

pub mod demo;
pub mod error;
pub mod state;
