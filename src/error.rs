//! Error types.
//!
//! Two layers:
//!
//! - [`PipelineError`] is the typed taxonomy raised by ingest, config and the
//!   estimation stages. Every variant is terminal for the run.
//! - [`AppError`] is what the binary sees: a message plus a process exit code.

use thiserror::Error;

/// Typed failure of a pipeline stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// A required mapping entry is missing (anchor year, plan assignment,
    /// vessel type absent from a paired table, target year not in a file).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required column is absent, or two tables that must align cover
    /// different vessel-type sets.
    #[error("schema error: {0}")]
    Schema(String),

    /// A numeric value is outside its allowed domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A ratio or ceiling needed a positive divisor and did not get one.
    #[error("division error: {0}")]
    Division(String),

    /// A file could not be opened, read or written.
    #[error("I/O error: {0}")]
    Io(String),
}

impl PipelineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn division(message: impl Into<String>) -> Self {
        Self::Division(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Io(_) => 2,
            PipelineError::Schema(_) => 3,
            PipelineError::Configuration(_) => 4,
            PipelineError::InvalidInput(_) => 5,
            PipelineError::Division(_) => 6,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), format!("[ERROR] {err}"))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
