//! Registered struct types.

use std::any::Any;
use std::collections::HashMap;

use exprnative_types::reflect::{FieldInfo, StructInfo};
use exprnative_types::{
    ConversionError, DeclType, EvalError, HostType, RuntimeType, Traits, TypeValue, Value,
};
use tracing::trace;

use crate::config::NativeTypesConfig;
use crate::error::RegistryError;
use crate::mapper::decl_type_of;
use crate::shape::{hash_struct, ShapeHash};

/// Capabilities every native struct type declares.
pub const NATIVE_TRAITS: Traits = Traits::FIELD_TESTER.union(Traits::INDEXER);

/// A field reachable from expressions.
#[derive(Debug, Clone)]
pub struct VisibleField {
    /// Name the field is reachable by.
    pub name: String,
    pub decl: DeclType,
    pub info: &'static FieldInfo,
}

/// Type descriptor of a host struct.
///
/// Built once from the struct's field table. Only fields that are `pub` and
/// whose type maps to a declared type are visible; the same set backs
/// checker declarations and runtime access.
#[derive(Debug)]
pub struct NativeType {
    name: String,
    info: &'static StructInfo,
    fields: Vec<VisibleField>,
    by_name: HashMap<String, usize>,
    shape: ShapeHash,
}

impl NativeType {
    /// Descriptor for a host type, which must be a struct after one level
    /// of pointer indirection.
    pub fn new(ty: &HostType, config: &NativeTypesConfig) -> Result<Self, RegistryError> {
        match ty.indirect() {
            HostType::Struct(info) => Ok(Self::from_info(info, config)),
            _ => Err(RegistryError::InvalidHostType(ty.to_string())),
        }
    }

    pub fn from_info(info: &'static StructInfo, config: &NativeTypesConfig) -> Self {
        let name = config.qualified_name(info);
        let mut fields = Vec::new();
        let mut by_name = HashMap::new();

        for field in &info.fields {
            let field_name = config.field_name(field);
            if !field.exported {
                trace!(type_name = %name, field = field_name, "hiding non-public field");
                continue;
            }
            let decl = match decl_type_of(&field.host_type(), config) {
                Ok(decl) => decl,
                Err(err) => {
                    trace!(type_name = %name, field = field_name, %err, "hiding field");
                    continue;
                }
            };
            by_name.insert(field_name.to_string(), fields.len());
            fields.push(VisibleField {
                name: field_name.to_string(),
                decl,
                info: field,
            });
        }

        let shape = hash_struct(&name, fields.iter().map(|f| (f.name.as_str(), &f.decl)));
        trace!(type_name = %name, fields = fields.len(), shape = %shape, "built native type");

        NativeType {
            name,
            info,
            fields,
            by_name,
            shape,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.name
    }

    pub fn info(&self) -> &'static StructInfo {
        self.info
    }

    /// The visible field called `name`.
    pub fn has_field(&self, name: &str) -> Option<&VisibleField> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Visible fields in declaration order.
    pub fn fields(&self) -> &[VisibleField] {
        &self.fields
    }

    pub fn shape_hash(&self) -> ShapeHash {
        self.shape
    }

    /// A type converts only to the type of types.
    pub fn convert_to_type(&self, target: &TypeValue) -> Value {
        if target.is_type_type() {
            return Value::Type(TypeValue::type_type());
        }
        Value::error(EvalError::Conversion(ConversionError::Unsupported {
            from: TypeValue::type_type().to_string(),
            to: target.to_string(),
        }))
    }
}

impl PartialEq for NativeType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl RuntimeType for NativeType {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn has_trait(&self, traits: Traits) -> bool {
        NATIVE_TRAITS.contains(traits)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
