//! Host reflection.
//!
//! Rust types take part in the bridge by implementing [`Reflect`] (dynamic,
//! object-safe) and [`Typed`] (static). Primitives, strings, containers,
//! `chrono` durations and timestamps and the [`Shared`] pointer forms are
//! covered here; structs get their implementations from
//! `#[derive(NativeType)]`, which also emits the per-type [`StructInfo`]
//! field table.
//!
//! # Kinds
//!
//! | Rust type | [`HostType`] |
//! |-----------|--------------|
//! | `bool` | `Bool` |
//! | `i8`..`i64`, `isize` | `Int` |
//! | `u8`..`u64`, `usize` | `Uint` |
//! | `f32`, `f64` | `Float` |
//! | `String` | `String` |
//! | `Vec<u8>`, `[u8; N]` | `Bytes` |
//! | `Vec<T>`, `[T; N]` | `List` |
//! | `HashMap<K, V>`, `BTreeMap<K, V>` | `Map` |
//! | `chrono::Duration` | `Duration` |
//! | `chrono::DateTime<Utc>` | `Timestamp` |
//! | `Shared<T>`, `Option<Shared<T>>` | `Pointer` |
//! | derived structs | `Struct` |
//! | `Option<fn(..) -> R>`, `Option<mpsc::Sender<T>>` | `Unsupported` |

mod from_value;
mod impls;

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::error::ConversionError;
use crate::message::StructuredMessage;
use crate::value::Value;

pub use from_value::FromValue;

/// Host pointer form. A `Shared<T>` is never null; `Option<Shared<T>>` is the
/// nullable pointer.
pub type Shared<T> = Arc<RwLock<T>>;

/// Wrap a value in its pointer form.
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

/// Package alias for a Rust module path: its last segment.
///
/// `my_app::models::identity` becomes `identity`.
pub fn simple_package_alias(module_path: &str) -> &str {
    module_path.rsplit("::").next().unwrap_or(module_path)
}

// ============================================================================
// Host type handles
// ============================================================================

/// Shape of a host type, as far as the bridge cares.
#[derive(Debug, Clone)]
pub enum HostType {
    Bool,
    Int { bits: u8 },
    Uint { bits: u8 },
    Float { bits: u8 },
    String,
    Bytes,
    /// The designated duration type.
    Duration,
    /// The designated timestamp type.
    Timestamp,
    List(Box<HostType>),
    Map(Box<HostType>, Box<HostType>),
    Struct(&'static StructInfo),
    Pointer(Box<HostType>),
    /// A structured message, by full name.
    Message(&'static str),
    /// A kind the bridge never maps (functions, channels, opaque fields).
    Unsupported(&'static str),
}

impl HostType {
    /// Resolve one level of pointer indirection.
    pub fn indirect(&self) -> &HostType {
        match self {
            HostType::Pointer(inner) => inner,
            other => other,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, HostType::Pointer(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            HostType::Bool => "bool",
            HostType::Int { .. } => "int",
            HostType::Uint { .. } => "uint",
            HostType::Float { .. } => "float",
            HostType::String => "string",
            HostType::Bytes => "bytes",
            HostType::Duration => "duration",
            HostType::Timestamp => "timestamp",
            HostType::List(_) => "list",
            HostType::Map(_, _) => "map",
            HostType::Struct(_) => "struct",
            HostType::Pointer(_) => "pointer",
            HostType::Message(_) => "message",
            HostType::Unsupported(kind) => *kind,
        }
    }
}

impl PartialEq for HostType {
    fn eq(&self, other: &Self) -> bool {
        use HostType::*;
        match (self, other) {
            (Bool, Bool) | (String, String) | (Bytes, Bytes) => true,
            (Duration, Duration) | (Timestamp, Timestamp) => true,
            (Int { bits: a }, Int { bits: b }) => a == b,
            (Uint { bits: a }, Uint { bits: b }) => a == b,
            (Float { bits: a }, Float { bits: b }) => a == b,
            (List(a), List(b)) | (Pointer(a), Pointer(b)) => a == b,
            (Map(ak, av), Map(bk, bv)) => ak == bk && av == bv,
            (Struct(a), Struct(b)) => a.type_id == b.type_id,
            (Message(a), Message(b)) => a == b,
            (Unsupported(a), Unsupported(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Int { bits } => write!(f, "i{}", bits),
            HostType::Uint { bits } => write!(f, "u{}", bits),
            HostType::Float { bits } => write!(f, "f{}", bits),
            HostType::List(elem) => write!(f, "[{}]", elem),
            HostType::Map(key, value) => write!(f, "map<{}, {}>", key, value),
            HostType::Struct(info) => write!(f, "{}", info.qualified_name()),
            HostType::Pointer(inner) => write!(f, "*{}", inner),
            HostType::Message(name) => write!(f, "{}", name),
            other => f.write_str(other.kind_name()),
        }
    }
}

// ============================================================================
// Field tables
// ============================================================================

/// Field table of a derived struct, built once per type.
pub struct StructInfo {
    /// Rust type name.
    pub name: &'static str,
    /// Package alias (last module path segment unless overridden).
    pub package: &'static str,
    pub type_id: TypeId,
    /// `TypeId`s of `Shared<T>` and `Option<Shared<T>>`.
    pub pointer_type_ids: [TypeId; 2],
    pub fields: Vec<FieldInfo>,
    pub new_zero: fn() -> Box<dyn Reflect>,
    /// Move a value of this type into the pointer form identified by the
    /// `TypeId`, or `None` when the id is not one of `pointer_type_ids`.
    pub box_pointer: fn(Box<dyn Reflect>, TypeId) -> Option<Box<dyn Any>>,
}

impl StructInfo {
    pub fn new<T: Typed>(name: &'static str, package: &'static str, fields: Vec<FieldInfo>) -> Self {
        StructInfo {
            name,
            package,
            type_id: TypeId::of::<T>(),
            pointer_type_ids: [TypeId::of::<Shared<T>>(), TypeId::of::<Option<Shared<T>>>()],
            fields,
            new_zero: new_zero::<T>,
            box_pointer: box_pointer::<T>,
        }
    }

    /// `<package>.<Name>`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }

    pub fn is_pointer_type(&self, id: TypeId) -> bool {
        self.pointer_type_ids.contains(&id)
    }
}

impl fmt::Debug for StructInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructInfo")
            .field("name", &self.name)
            .field("package", &self.package)
            .field("fields", &self.fields)
            .finish()
    }
}

/// One field of a [`StructInfo`].
pub struct FieldInfo {
    /// Rust field name.
    pub name: &'static str,
    /// Name from `#[native(rename = "...")]`.
    pub rename: Option<&'static str>,
    /// Position in declaration order.
    pub index: usize,
    /// Whether the field is `pub`.
    pub exported: bool,
    /// Computed on demand so self-referential structs don't recurse while
    /// their table is being built.
    pub host_type: fn() -> HostType,
    /// Convert a runtime value into the field's host representation.
    pub convert: fn(&Value) -> Result<Box<dyn Reflect>, ConversionError>,
    /// Store a converted value into the field of a struct instance.
    pub assign: fn(&mut dyn Reflect, Box<dyn Reflect>) -> Result<(), ConversionError>,
}

impl FieldInfo {
    pub fn host_type(&self) -> HostType {
        (self.host_type)()
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("name", &self.name)
            .field("rename", &self.rename)
            .field("index", &self.index)
            .field("exported", &self.exported)
            .finish()
    }
}

/// `FieldInfo::convert` for a field of type `T`.
pub fn convert_field<T: Typed + FromValue>(value: &Value) -> Result<Box<dyn Reflect>, ConversionError> {
    T::from_value(value).map(|v| Box::new(v) as Box<dyn Reflect>)
}

/// `FieldInfo::convert` for `#[native(opaque)]` fields.
pub fn reject_field(value: &Value) -> Result<Box<dyn Reflect>, ConversionError> {
    Err(ConversionError::Unsupported {
        from: value.type_value().type_name().to_string(),
        to: "opaque".to_string(),
    })
}

/// Downcast a converted field value back to its concrete type.
pub fn take_field<T: Any>(value: Box<dyn Reflect>) -> Result<T, ConversionError> {
    let got = value.host_type().to_string();
    value
        .into_any()
        .downcast::<T>()
        .map(|v| *v)
        .map_err(|_| ConversionError::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            got,
        })
}

/// Downcast an instance handed to `FieldInfo::assign`.
pub fn struct_mut<T: Any>(target: &mut dyn Reflect) -> Result<&mut T, ConversionError> {
    let got = target.host_type().to_string();
    target
        .as_any_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| ConversionError::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            got,
        })
}

fn new_zero<T: Typed>() -> Box<dyn Reflect> {
    Box::new(T::zero())
}

fn box_pointer<T: Typed>(value: Box<dyn Reflect>, target: TypeId) -> Option<Box<dyn Any>> {
    let value = *value.into_any().downcast::<T>().ok()?;
    if target == TypeId::of::<Shared<T>>() {
        Some(Box::new(shared(value)))
    } else if target == TypeId::of::<Option<Shared<T>>>() {
        Some(Box::new(Some(shared(value))))
    } else {
        None
    }
}

// ============================================================================
// Reflection traits
// ============================================================================

/// Dynamic access to a host value.
pub trait Reflect: Any + Send + Sync + fmt::Debug {
    fn host_type(&self) -> HostType;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Clone behind a box. Cloning a [`Shared`] shares the pointee.
    fn clone_reflect(&self) -> Box<dyn Reflect>;

    /// A fresh zero value of the same type.
    fn zero_value(&self) -> Box<dyn Reflect>;

    fn is_zero(&self) -> bool;

    /// Deep structural equality with a value of the same type. Pointers
    /// compare by pointee.
    fn reflect_eq(&self, other: &dyn Reflect) -> bool;

    fn view(&self) -> View<'_>;
}

/// Static counterpart of [`Reflect`].
pub trait Typed: Reflect + Clone {
    fn type_of() -> HostType;

    fn zero() -> Self;
}

/// Implemented by derived structs.
pub trait NativeStruct: Typed {
    fn struct_info() -> &'static StructInfo;
}

/// Borrowed view of a host value.
pub enum View<'a> {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(&'a str),
    Bytes(&'a [u8]),
    Duration(Duration),
    Timestamp(DateTime<Utc>),
    List(&'a dyn ReflectList),
    Map(&'a dyn ReflectMap),
    Struct(&'a dyn ReflectStruct),
    Pointer(&'a dyn ReflectPointer),
    Message(&'a dyn StructuredMessage),
    Opaque,
}

pub trait ReflectList {
    fn len(&self) -> usize;

    fn element(&self, index: usize) -> Option<&dyn Reflect>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait ReflectMap {
    fn len(&self) -> usize;

    /// Look up by runtime key. Keys that don't convert to the host key type
    /// are absent.
    fn get(&self, key: &Value) -> Option<&dyn Reflect>;

    fn entries(&self) -> Vec<(&dyn Reflect, &dyn Reflect)>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait ReflectStruct {
    fn info(&self) -> &'static StructInfo;

    /// Field by position. `None` for opaque fields.
    fn field(&self, index: usize) -> Option<&dyn Reflect>;
}

pub trait ReflectPointer {
    /// Run `f` on the pointee while it is read locked. Returns false for a
    /// null pointer.
    fn with_pointee(&self, f: &mut dyn FnMut(&dyn Reflect)) -> bool;

    /// A new, non-null pointer to a zero pointee.
    fn alloc_zero(&self) -> Box<dyn Reflect>;

    fn is_null(&self) -> bool;
}

/// Apply `f` after resolving one level of pointer indirection. `None` for a
/// null pointer.
pub fn with_indirect<R>(value: &dyn Reflect, f: impl FnOnce(&dyn Reflect) -> R) -> Option<R> {
    match value.view() {
        View::Pointer(ptr) => {
            let mut f = Some(f);
            let mut out = None;
            ptr.with_pointee(&mut |inner| {
                if let Some(f) = f.take() {
                    out = Some(f(inner));
                }
            });
            out
        }
        _ => Some(f(value)),
    }
}

/// Shared boilerplate of [`Reflect`] implementations for `Typed + Clone`
/// types.
#[doc(hidden)]
#[macro_export]
macro_rules! __reflect_basics {
    () => {
        fn host_type(&self) -> $crate::reflect::HostType {
            <Self as $crate::reflect::Typed>::type_of()
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }

        fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
            self
        }

        fn clone_reflect(&self) -> ::std::boxed::Box<dyn $crate::reflect::Reflect> {
            ::std::boxed::Box::new(::std::clone::Clone::clone(self))
        }

        fn zero_value(&self) -> ::std::boxed::Box<dyn $crate::reflect::Reflect> {
            ::std::boxed::Box::new(<Self as $crate::reflect::Typed>::zero())
        }
    };
}
