//! Orchestration domain types.

pub mod context;
pub mod routing;
