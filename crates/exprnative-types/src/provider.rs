//! Adapter and provider interfaces consumed by the checker and interpreter.

use std::fmt;
use std::sync::Arc;

use crate::decls::DeclType;
use crate::error::EvalError;
use crate::reflect::Reflect;
use crate::value::Value;

/// A value crossing into the runtime.
#[derive(Debug, Clone)]
pub enum Native {
    /// Absent value.
    Null,
    /// Already a runtime value.
    Value(Value),
    /// A host value.
    Host(Arc<dyn Reflect>),
}

impl Native {
    pub fn host<T: Reflect>(value: T) -> Self {
        Native::Host(Arc::new(value))
    }

    pub fn from_boxed(value: Box<dyn Reflect>) -> Self {
        Native::Host(Arc::from(value))
    }
}

impl From<Value> for Native {
    fn from(value: Value) -> Self {
        Native::Value(value)
    }
}

/// Lifts host values into runtime values.
pub trait TypeAdapter: Send + Sync {
    fn native_to_value(&self, value: Native) -> Value;
}

/// Resolves type names for the checker and constructs values for the
/// interpreter.
pub trait TypeProvider: Send + Sync {
    fn enum_value(&self, name: &str) -> Value;

    /// Value of an identifier naming a type.
    fn find_ident(&self, name: &str) -> Option<Value>;

    /// Declaration of an identifier naming a type, i.e. `type(T)`.
    fn find_type(&self, name: &str) -> Option<DeclType>;

    fn find_field_type(&self, type_name: &str, field: &str) -> Option<FieldType>;

    /// Construct an instance from field initializers. Failures come back as
    /// error values.
    fn new_value(&self, type_name: &str, fields: &[(String, Value)]) -> Value;
}

pub type IsSetFn = dyn Fn(&dyn Reflect) -> bool + Send + Sync;
pub type GetFromFn = dyn Fn(&dyn Reflect) -> Result<Value, EvalError> + Send + Sync;

/// Declared type of a field plus accessors over a host instance.
#[derive(Clone)]
pub struct FieldType {
    pub decl: DeclType,
    /// Whether the field holds a non-zero value.
    pub is_set: Arc<IsSetFn>,
    /// Read the field, normalized and lifted.
    pub get_from: Arc<GetFromFn>,
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldType").field("decl", &self.decl).finish_non_exhaustive()
    }
}
