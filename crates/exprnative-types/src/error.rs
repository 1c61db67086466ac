//! Error types shared by the value model and the reflection layer.

use thiserror::Error;

/// Failure to convert between a runtime value and a host representation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("value {value} out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("type conversion error from '{from}' to '{to}'")]
    Unsupported { from: String, to: String },

    #[error("wrong length: expected {expected}, got {got}")]
    WrongLength { expected: usize, got: usize },

    #[error("field '{0}': {1}")]
    FieldError(String, Box<ConversionError>),

    #[error("index {0}: {1}")]
    IndexError(usize, Box<ConversionError>),

    #[error("map key: {0}")]
    KeyError(Box<ConversionError>),

    #[error("cannot represent {0} as JSON")]
    Json(String),
}

impl ConversionError {
    pub fn mismatch(expected: impl Into<String>, got: &crate::Value) -> Self {
        ConversionError::TypeMismatch {
            expected: expected.into(),
            got: got.type_value().type_name().to_string(),
        }
    }
}

/// Error carried by [`crate::Value::Error`].
///
/// Per-value failures (field lookup, conversion, type mismatch) travel through
/// evaluation as values so the interpreter can propagate them like any other
/// result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("no such field: {0}")]
    NoSuchField(String),

    #[error("no such overload: {0}")]
    NoSuchOverload(String),

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("unsupported type conversion: {0}")]
    UnsupportedType(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("{0}")]
    Message(String),
}
