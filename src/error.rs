use std::num::ParseIntError;
use thiserror::Error;

/// Result type for ring pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while assembling or running the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Ring buffer was asked for zero slots
    #[error("Ring buffer capacity must be positive, got {0}")]
    InvalidCapacity(usize),

    /// No filter stages in pipeline
    #[error("Cannot start pipeline with no stages")]
    NoStages,

    /// An input line is not an integer
    #[error("Invalid integer input {input:?}: {source}")]
    Parse {
        input: String,
        #[source]
        source: ParseIntError,
    },

    /// An input line is not valid UTF-8
    #[error("Input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The sink could not render a flush
    #[error("Sink error: {0}")]
    SinkError(String),

    /// Thread spawn or join error
    #[error("Thread error: {0}")]
    ThreadError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Console or stream I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
