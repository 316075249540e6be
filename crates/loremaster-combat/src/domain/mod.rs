//! Turn decisions and prompts.

pub mod phase;
pub mod prompts;
