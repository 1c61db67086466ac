//! Error types for type registration and declaration synthesis.

use thiserror::Error;

/// Errors that fail building a [`NativeTypeProvider`](crate::NativeTypeProvider).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// A registration argument was neither a host type nor a host value.
    #[error("unsupported native type argument: {0} (must be a host type or a host value)")]
    UnsupportedArgument(String),

    /// The registered type is not a struct after one level of indirection.
    #[error("unsupported host type {0}, must be a struct")]
    InvalidHostType(String),
}

/// A host type with no declared-type counterpart.
///
/// Fields of such a type are hidden; the rest of the struct stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported field kind: {kind}")]
pub struct UnsupportedFieldKind {
    pub kind: String,
}

impl UnsupportedFieldKind {
    pub(crate) fn new(kind: impl Into<String>) -> Self {
        UnsupportedFieldKind { kind: kind.into() }
    }
}

/// Errors loading a [`NativeTypesConfig`](crate::NativeTypesConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
