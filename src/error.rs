use crate::config::ConfigError;
use crate::engine::UsageError;
use crate::orchestration::RunError;
use thiserror::Error;

/// Errors that end the whole run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Usage(#[from] UsageError),
    #[error("Run aborted: {0}")]
    Run(#[from] RunError),
}

impl AppError {
    /// Process exit code; usage errors follow the conventional 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Usage(_) => 2,
            AppError::Config(_) | AppError::Run(_) => 1,
        }
    }
}
