//! Shared test doubles and fixtures for the Loremaster engine.

mod clock;
mod factory;
pub mod fixtures;
mod narrator;
mod rng;
mod summarizer;

pub use clock::FixedClock;
pub use factory::ScriptedFactory;
pub use narrator::{RecordedRequest, ScriptAction, ScriptedNarrator};
pub use rng::{MockRng, SequenceRng};
pub use summarizer::ScriptedSummarizer;
