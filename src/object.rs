//! Live host struct instances as runtime objects.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use exprnative_types::reflect::{with_indirect, Reflect, View};
use exprnative_types::{
    ConversionError, EvalError, Native, NativeTarget, ObjectRef, ObjectValue, TypeAdapter,
    TypeValue, Value,
};

use crate::descriptor::{NativeType, VisibleField};
use crate::normalize::{field_is_set, field_value};
use crate::registry::NativeTypeProvider;

type JsonStruct = serde_json::Map<String, serde_json::Value>;

/// A host struct value, held directly or through one pointer.
pub struct NativeObject {
    adapter: NativeTypeProvider,
    value: Arc<dyn Reflect>,
    ty: Arc<NativeType>,
}

impl NativeObject {
    pub(crate) fn new(adapter: NativeTypeProvider, value: Arc<dyn Reflect>, ty: Arc<NativeType>) -> Self {
        NativeObject { adapter, value, ty }
    }

    /// The host value as it was handed in.
    pub fn value(&self) -> &Arc<dyn Reflect> {
        &self.value
    }

    pub fn native_type(&self) -> &Arc<NativeType> {
        &self.ty
    }

    fn is_pointer(&self) -> bool {
        self.value.host_type().is_pointer()
    }

    fn resolve_field(&self, field: &Value) -> Result<&VisibleField, Value> {
        let name = match field {
            Value::String(name) => name,
            other => {
                return Err(Value::error(EvalError::NoSuchOverload(format!(
                    "{}.{}",
                    self.ty.type_name(),
                    other.type_value()
                ))))
            }
        };
        self.ty
            .has_field(name)
            .ok_or_else(|| Value::error(EvalError::NoSuchField(name.clone())))
    }

    /// Exported, non-zero fields by name. Zero fields are left out.
    pub fn to_json_struct(&self) -> Result<JsonStruct, ConversionError> {
        let mut set_fields = Vec::new();
        with_indirect(&*self.value, |value| {
            if let View::Struct(s) = value.view() {
                for field in self.ty.fields() {
                    if let Some(raw) = s.field(field.info.index) {
                        if !raw.is_zero() {
                            set_fields.push((field.name.clone(), raw.clone_reflect()));
                        }
                    }
                }
            }
        });

        let mut out = JsonStruct::new();
        for (name, raw) in set_fields {
            let json = self
                .adapter
                .native_to_value(Native::from_boxed(raw))
                .to_json()
                .map_err(|e| ConversionError::FieldError(name.clone(), Box::new(e)))?;
            out.insert(name, json);
        }
        Ok(out)
    }
}

impl ObjectValue for NativeObject {
    fn type_value(&self) -> TypeValue {
        TypeValue::from_arc(self.ty.clone())
    }

    fn get(&self, field: &Value) -> Value {
        let field = match self.resolve_field(field) {
            Ok(field) => field,
            Err(err) => return err,
        };
        field_value(&self.adapter, &*self.value, self.ty.info(), field.info.index)
            .unwrap_or_else(|| Value::error(EvalError::NoSuchField(field.name.clone())))
    }

    fn is_set(&self, field: &Value) -> Value {
        match self.resolve_field(field) {
            Ok(field) => Value::Bool(field_is_set(&*self.value, self.ty.info(), field.info.index)),
            Err(err) => err,
        }
    }

    fn is_zero_value(&self) -> bool {
        with_indirect(&*self.value, |value| value.is_zero()).unwrap_or(true)
    }

    /// Pointer-transparent deep equality: a pointer and the value it points
    /// to compare equal.
    fn equal(&self, other: &Value) -> bool {
        let Some(other) = other.as_object().and_then(|o| o.downcast_ref::<NativeObject>()) else {
            return false;
        };
        if Arc::ptr_eq(&self.value, &other.value) {
            return true;
        }
        with_indirect(&*self.value, |lhs| {
            with_indirect(&*other.value, |rhs| lhs.reflect_eq(rhs))
        })
        .flatten()
        .unwrap_or(false)
    }

    fn convert_to_type(self: Arc<Self>, target: &TypeValue) -> Value {
        if target.is_type_type() {
            return Value::Type(self.type_value());
        }
        if target.type_name() == self.ty.type_name() {
            return Value::Object(ObjectRef::from_arc(self));
        }
        Value::error(EvalError::Conversion(ConversionError::Unsupported {
            from: self.ty.type_name().to_string(),
            to: target.to_string(),
        }))
    }

    fn convert_to_native(&self, target: NativeTarget) -> Result<Box<dyn Any>, ConversionError> {
        let info = self.ty.info();

        // Same representation.
        if self.value.as_any().type_id() == target.id {
            return Ok(self.value.clone_reflect().into_any());
        }
        // Pointer -> pointee.
        if self.is_pointer() && target.id == info.type_id {
            if let Some(pointee) = with_indirect(&*self.value, |v| v.clone_reflect()) {
                return Ok(pointee.into_any());
            }
        }
        // Value -> fresh pointer.
        if !self.is_pointer() && info.is_pointer_type(target.id) {
            if let Some(ptr) = (info.box_pointer)(self.value.clone_reflect(), target.id) {
                return Ok(ptr);
            }
        }
        if target.is::<serde_json::Value>() {
            return Ok(Box::new(serde_json::Value::Object(self.to_json_struct()?)));
        }
        if target.is::<JsonStruct>() {
            return Ok(Box::new(self.to_json_struct()?));
        }
        Err(ConversionError::Unsupported {
            from: self.ty.type_name().to_string(),
            to: target.name.to_string(),
        })
    }

    fn to_json(&self) -> Result<serde_json::Value, ConversionError> {
        self.to_json_struct().map(serde_json::Value::Object)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeObject")
            .field("type", &self.ty.type_name())
            .field("value", &self.value)
            .finish()
    }
}
