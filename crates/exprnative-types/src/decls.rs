//! Declared types as seen by the static type checker.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A type in the checker's declared type algebra.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum DeclType {
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Duration,
    Timestamp,
    Dyn,
    Null,
    List(Box<DeclType>),
    Map(Box<DeclType>, Box<DeclType>),
    /// Object (struct or message) type referenced by qualified name.
    Object(String),
    /// The type of a type: what an identifier naming a type evaluates to.
    Type(Box<DeclType>),
}

pub const BOOL: DeclType = DeclType::Bool;
pub const INT: DeclType = DeclType::Int;
pub const UINT: DeclType = DeclType::Uint;
pub const DOUBLE: DeclType = DeclType::Double;
pub const STRING: DeclType = DeclType::String;
pub const BYTES: DeclType = DeclType::Bytes;
pub const DURATION: DeclType = DeclType::Duration;
pub const TIMESTAMP: DeclType = DeclType::Timestamp;
pub const DYN: DeclType = DeclType::Dyn;

/// Reference to an object type by its qualified name.
pub fn object_type(name: impl Into<String>) -> DeclType {
    DeclType::Object(name.into())
}

/// The type-of-type wrapper around `inner`.
pub fn type_type(inner: DeclType) -> DeclType {
    DeclType::Type(Box::new(inner))
}

pub fn list_of(elem: DeclType) -> DeclType {
    DeclType::List(Box::new(elem))
}

pub fn map_of(key: DeclType, value: DeclType) -> DeclType {
    DeclType::Map(Box::new(key), Box::new(value))
}

impl DeclType {
    /// Declared type for a builtin type name, if `name` is one.
    pub fn builtin(name: &str) -> Option<DeclType> {
        let decl = match name {
            "bool" => BOOL,
            "int" => INT,
            "uint" => UINT,
            "double" => DOUBLE,
            "string" => STRING,
            "bytes" => BYTES,
            "duration" => DURATION,
            "timestamp" => TIMESTAMP,
            "dyn" => DYN,
            "null_type" => DeclType::Null,
            "list" => list_of(DYN),
            "map" => map_of(DYN, DYN),
            _ => return None,
        };
        Some(decl)
    }
}

impl fmt::Display for DeclType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclType::Bool => write!(f, "bool"),
            DeclType::Int => write!(f, "int"),
            DeclType::Uint => write!(f, "uint"),
            DeclType::Double => write!(f, "double"),
            DeclType::String => write!(f, "string"),
            DeclType::Bytes => write!(f, "bytes"),
            DeclType::Duration => write!(f, "duration"),
            DeclType::Timestamp => write!(f, "timestamp"),
            DeclType::Dyn => write!(f, "dyn"),
            DeclType::Null => write!(f, "null_type"),
            DeclType::List(elem) => write!(f, "list({})", elem),
            DeclType::Map(key, value) => write!(f, "map({}, {})", key, value),
            DeclType::Object(name) => write!(f, "{}", name),
            DeclType::Type(inner) => write!(f, "type({})", inner),
        }
    }
}
