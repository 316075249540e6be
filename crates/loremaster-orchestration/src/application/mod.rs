//! Orchestration services.

pub mod combat_loop;
pub mod context_builder;
mod invoke;
pub mod orchestrator;
pub mod services;
pub mod step;
pub mod steps;
pub mod transition;
