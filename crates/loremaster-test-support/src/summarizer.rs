//! Scripted summarizer.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use loremaster_narrator::application::narrator::{SummaryRequest, Summarizer};
use loremaster_narrator::error::NarratorError;

/// A summarizer that fails a set number of times, then returns a fixed
/// summary.
#[derive(Debug)]
pub struct ScriptedSummarizer {
    summary: String,
    failures: usize,
    calls: AtomicUsize,
}

impl ScriptedSummarizer {
    /// Always succeeds with `summary`.
    #[must_use]
    pub fn new(summary: &str) -> Self {
        Self::failing_first(0, summary)
    }

    /// Fails the first `failures` calls, then succeeds with `summary`.
    #[must_use]
    pub fn failing_first(failures: usize, summary: &str) -> Self {
        Self {
            summary: summary.to_owned(),
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    /// Never succeeds.
    #[must_use]
    pub fn always_failing() -> Self {
        Self::failing_first(usize::MAX, "")
    }

    /// Number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, _request: &SummaryRequest) -> Result<String, NarratorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(NarratorError::Summary("summarizer unavailable".to_owned()));
        }
        Ok(self.summary.clone())
    }
}
