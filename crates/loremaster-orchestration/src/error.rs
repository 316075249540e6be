//! Orchestration error types.

use loremaster_core::error::DomainError;
use loremaster_dispatch::error::DispatchError;
use loremaster_narrator::domain::role::NarratorRole;
use thiserror::Error;

/// Failures of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestrationError {
    /// A domain rule failed outside a handler, e.g. an unknown session.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A command could not be routed or its handler failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The narrative or combat narrator failed.
    #[error("{role} narrator failed: {message}")]
    NarratorFailed {
        /// Which narrator failed.
        role: NarratorRole,
        /// What it reported.
        message: String,
    },
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
}
