//! Narrator error types.

use thiserror::Error;

/// Failures at the narrator capability boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarratorError {
    /// The underlying generation failed or raised.
    #[error("narrator generation failed: {0}")]
    Generation(String),

    /// The summarizer produced nothing usable.
    #[error("summarization failed: {0}")]
    Summary(String),
}
