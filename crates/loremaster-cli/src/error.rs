//! Startup and runtime errors for the terminal front end.

use loremaster_dispatch::error::DispatchError;
use loremaster_orchestration::error::{ConfigError, OrchestrationError};
use thiserror::Error;

/// Everything that can stop the front end.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable holds an unusable value.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Handler registration failed at startup.
    #[error("dispatcher setup failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// A turn could not be processed.
    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    /// Terminal I/O failed.
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),
}
