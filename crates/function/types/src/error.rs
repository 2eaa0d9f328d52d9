//! Error taxonomy for function invocation
//!
//! Configuration and lookup errors are fatal at startup. Everything else is
//! scoped to a single invocation: it aborts that request and leaves the
//! invoker usable for the next one.

/// Errors that can occur while configuring or invoking a function
#[derive(Debug, thiserror::Error)]
pub enum FunctionError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Function not found: '{0}'")]
    FunctionNotFound(String),

    #[error("Failed to decode payload: {0}")]
    PayloadDecode(String),

    #[error("Failed to evaluate expression '{expression}' for header '{field}': {message}")]
    ExpressionEvaluation {
        field: String,
        expression: String,
        message: String,
    },

    #[error("Function '{function}' failed: {message}")]
    Invocation { function: String, message: String },

    #[error("Failed to encode payload: {0}")]
    PayloadEncode(String),

    #[error("Function produced an empty sequence")]
    EmptySequence,

    #[error("Drained sequence exceeded {limit}: {observed} > {max}")]
    DrainLimitExceeded {
        limit: &'static str,
        observed: usize,
        max: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FunctionError {
    /// Build an invocation error for the named function
    pub fn invocation(function: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Invocation {
            function: function.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error can only occur while the invoker is being built
    pub fn is_startup(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::FunctionNotFound(_))
    }
}

/// Result type alias for function operations
pub type FunctionResult<T> = Result<T, FunctionError>;
