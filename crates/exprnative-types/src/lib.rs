//! Value model and host reflection for exprnative.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  value      - runtime values             │
//! │  decls      - checker type declarations  │
//! │  reflect    - host type introspection    │
//! │  provider   - adapter / provider traits  │
//! │  base       - builtin fallback chain     │
//! │  message    - structured messages        │
//! └──────────────────────────────────────────┘
//! ```
//!
//! Host structs opt in with `#[derive(NativeType)]` from `exprnative-derive`;
//! the `exprnative` crate turns them into language object types.

pub mod base;
pub mod decls;
pub mod error;
pub mod message;
pub mod provider;
pub mod reflect;
pub mod type_value;
pub mod value;

pub use base::{BaseAdapter, BaseProvider};
pub use decls::DeclType;
pub use error::{ConversionError, EvalError};
pub use message::StructuredMessage;
pub use provider::{FieldType, Native, TypeAdapter, TypeProvider};
pub use reflect::{shared, FromValue, HostType, NativeStruct, Reflect, Shared, StructInfo, Typed};
pub use type_value::{BuiltinType, RuntimeType, Traits, TypeValue};
pub use value::{ListValue, MapValue, NativeTarget, ObjectRef, ObjectValue, Value};
