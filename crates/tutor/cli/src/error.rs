//! CLI error types.

use thiserror::Error;

/// CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transcript error: {0}")]
    Transcript(#[from] tutor_transcript::TranscriptError),
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
