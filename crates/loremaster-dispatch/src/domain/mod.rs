//! Command, result, and broadcast value types.

pub mod commands;
pub mod dice;
pub mod events;
pub mod results;
