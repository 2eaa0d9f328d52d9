//! Expression error types

/// Errors that can occur while parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("Parse error at column {col}: {message}")]
    ParseError { col: usize, message: String },

    #[error("Unexpected token at column {col}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        col: usize,
    },

    #[error("Unexpected end of expression: expected {0}")]
    UnexpectedEof(String),

    #[error("Unknown root property '{0}'")]
    UnknownRoot(String),

    #[error("Property '{0}' cannot be found")]
    MissingProperty(String),

    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("Cannot apply {operation} to {found}")]
    TypeMismatch { operation: String, found: String },

    #[error("Method '{method}' is not supported on {target}")]
    UnknownMethod { method: String, target: String },

    #[error("Method '{method}' expects {expected} argument(s), got {found}")]
    ArgumentCount {
        method: String,
        expected: String,
        found: usize,
    },

    #[error("Cannot access '{0}' on null")]
    NullReference(String),
}

impl ExpressionError {
    /// Whether the error was raised before evaluation started
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            Self::ParseError { .. } | Self::UnexpectedToken { .. } | Self::UnexpectedEof(_)
        )
    }
}

/// Result type alias for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;
