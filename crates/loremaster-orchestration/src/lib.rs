//! Loremaster — Orchestration Pipeline.
//!
//! Routes one player input through an ordered list of steps: dialogue
//! detection, narrator selection, context enrichment, narrator execution,
//! and the narrative/combat handoffs including the bounded combat
//! auto-continuation loop. The `Orchestrator` is the entry point; every
//! collaborator is constructed explicitly and handed in through
//! `EngineServices`.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
