//! Error types for configuration parsing and rewriting

use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while reading, parsing, or rewriting configuration files
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A line inside an object definition could not be parsed
    #[error("unsupported syntax at {location}: {message}")]
    Syntax {
        /// Human-readable source reference (`file line N` or `line N`)
        location: String,
        /// What was wrong with the line
        message: String,
    },

    /// End of input inside an object definition
    #[error("unterminated object definition starting at {0}")]
    UnterminatedBlock(String),
}
