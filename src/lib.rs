//! exprnative: Rust structs as first-class object types in an embedded
//! expression language.
//!
//! Host structs opt in with `#[derive(NativeType)]`. Registering them with a
//! [`NativeTypeProvider`] makes them visible to the checker (type and field
//! declarations) and to the runtime (field selection, presence tests,
//! construction, equality and conversion back to host values).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          NativeTypeProvider             │
//! │                                         │
//! │  descriptor - struct type descriptors   │
//! │  mapper     - host type -> decl type    │
//! │  object     - live struct instances     │
//! │  views      - lazy list / map views     │
//! │  normalize  - zero value defaults       │
//! │  shape      - type shape fingerprints   │
//! │                                         │
//! ├─────────────────────────────────────────┤
//! │  fallback adapter / provider chain      │
//! │  (exprnative-types: BaseAdapter, ...)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use exprnative::{NativeType, NativeTypes};
//!
//! #[derive(Debug, Clone, NativeType)]
//! #[native(package = "identity")]
//! pub struct Account {
//!     #[native(rename = "ID")]
//!     pub id: String,
//!     pub emails: Vec<String>,
//! }
//!
//! let provider = NativeTypes::new().register::<Account>().build_with_base()?;
//! assert!(provider.find_type("identity.Account").is_some());
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod mapper;
pub mod normalize;
pub mod object;
pub mod registry;
pub mod shape;
pub mod views;

pub use config::NativeTypesConfig;
pub use descriptor::{NativeType, VisibleField, NATIVE_TRAITS};
pub use error::{ConfigError, RegistryError, UnsupportedFieldKind};
pub use mapper::decl_type_of;
pub use object::NativeObject;
pub use registry::{NativeTypeProvider, NativeTypes, RegisterArg};
pub use shape::ShapeHash;
pub use views::{NativeList, NativeMap};

pub use exprnative_derive::NativeType;
pub use exprnative_types as types;
pub use exprnative_types::{shared, Native, Shared, TypeAdapter, TypeProvider, Value};
