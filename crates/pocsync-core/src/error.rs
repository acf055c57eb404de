use thiserror::Error;

/// Core error type for the Pocsync runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An action was requested that no integration provides
    #[error("Action not found: {0}")]
    ActionNotFound(String),

    /// A pipeline, step or action input failed validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// An action reported a failure while executing
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Encoding or decoding a value failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// No route rule matched the event
    #[error("No matching rule found")]
    NoMatchingRoute,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(err: String) -> Self {
        CoreError::Other(err)
    }
}

impl From<&str> for CoreError {
    fn from(err: &str) -> Self {
        CoreError::Other(err.to_string())
    }
}
