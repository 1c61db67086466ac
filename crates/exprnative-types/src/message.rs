//! Structured messages: schema-described records with a JSON form.
//!
//! A host type becomes a message with a [`StructuredMessage`] implementation
//! plus [`structured_message!`](crate::structured_message), which supplies its
//! reflection under the message's full name. Messages are lifted by the
//! [`BaseAdapter`](crate::BaseAdapter), never by the native bridge.

use std::any::Any;
use std::sync::Arc;

use crate::error::{ConversionError, EvalError};
use crate::reflect::Reflect;
use crate::type_value::{RuntimeType, Traits, TypeValue};
use crate::value::{NativeTarget, ObjectValue, Value};

pub trait StructuredMessage: Send + Sync {
    /// Fully qualified message name, e.g. `google.type.Money`.
    fn full_name(&self) -> &'static str;

    /// Set fields as a JSON object.
    fn to_json(&self) -> serde_json::Map<String, serde_json::Value>;
}

/// Declare a host type as a structured message named `$name`.
///
/// The type must be `Clone + Debug + Default + Send + Sync` and implement
/// [`StructuredMessage`].
#[macro_export]
macro_rules! structured_message {
    ($ty:ty, $name:expr) => {
        impl $crate::reflect::Reflect for $ty {
            $crate::__reflect_basics!();

            fn is_zero(&self) -> bool {
                $crate::message::StructuredMessage::to_json(self).is_empty()
            }

            fn reflect_eq(&self, other: &dyn $crate::reflect::Reflect) -> bool {
                match $crate::reflect::Reflect::as_any(other).downcast_ref::<$ty>() {
                    Some(other) => {
                        $crate::message::StructuredMessage::to_json(self)
                            == $crate::message::StructuredMessage::to_json(other)
                    }
                    None => false,
                }
            }

            fn view(&self) -> $crate::reflect::View<'_> {
                $crate::reflect::View::Message(self)
            }
        }

        impl $crate::reflect::Typed for $ty {
            fn type_of() -> $crate::reflect::HostType {
                $crate::reflect::HostType::Message($name)
            }

            fn zero() -> Self {
                <$ty as ::std::default::Default>::default()
            }
        }

        impl $crate::reflect::FromValue for $ty {
            fn from_value(value: &$crate::Value) -> Result<Self, $crate::ConversionError> {
                match value {
                    $crate::Value::Object(obj) => obj.convert_to_native::<$ty>(),
                    other => Err($crate::ConversionError::mismatch($name, other)),
                }
            }
        }
    };
}

/// Runtime type of a structured message.
#[derive(Debug, Clone)]
pub struct MessageType {
    name: &'static str,
}

impl MessageType {
    pub fn new(name: &'static str) -> Self {
        MessageType { name }
    }
}

impl RuntimeType for MessageType {
    fn type_name(&self) -> &str {
        self.name
    }

    fn has_trait(&self, traits: Traits) -> bool {
        (Traits::FIELD_TESTER | Traits::INDEXER).contains(traits)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A lifted structured message. Field access goes through the JSON form.
#[derive(Debug)]
pub struct MessageObject {
    value: Arc<dyn Reflect>,
    name: &'static str,
}

impl MessageObject {
    /// `None` unless `value` is a message after pointer resolution.
    pub fn new(value: Arc<dyn Reflect>) -> Option<Self> {
        let name = crate::reflect::with_indirect(&*value, |v| match v.view() {
            crate::reflect::View::Message(msg) => Some(msg.full_name()),
            _ => None,
        })??;
        Some(MessageObject { value, name })
    }

    fn fields(&self) -> serde_json::Map<String, serde_json::Value> {
        crate::reflect::with_indirect(&*self.value, |v| match v.view() {
            crate::reflect::View::Message(msg) => msg.to_json(),
            _ => serde_json::Map::new(),
        })
        .unwrap_or_default()
    }

    fn field_name<'a>(&self, field: &'a Value) -> Result<&'a str, Value> {
        match field {
            Value::String(name) => Ok(name),
            other => Err(Value::error(EvalError::NoSuchOverload(format!(
                "field access with {}",
                other.type_value()
            )))),
        }
    }
}

impl ObjectValue for MessageObject {
    fn type_value(&self) -> TypeValue {
        TypeValue::new(MessageType::new(self.name))
    }

    fn get(&self, field: &Value) -> Value {
        let name = match self.field_name(field) {
            Ok(name) => name,
            Err(err) => return err,
        };
        match self.fields().get(name) {
            Some(json) => Value::from_json(json),
            None => Value::error(EvalError::NoSuchField(name.to_string())),
        }
    }

    fn is_set(&self, field: &Value) -> Value {
        match self.field_name(field) {
            Ok(name) => Value::Bool(self.fields().contains_key(name)),
            Err(err) => err,
        }
    }

    fn is_zero_value(&self) -> bool {
        self.fields().is_empty()
    }

    fn equal(&self, other: &Value) -> bool {
        match other.as_object().and_then(|o| o.downcast_ref::<MessageObject>()) {
            Some(other) => self.name == other.name && self.fields() == other.fields(),
            None => false,
        }
    }

    fn convert_to_type(self: Arc<Self>, target: &TypeValue) -> Value {
        if target.is_type_type() {
            return Value::Type(self.type_value());
        }
        if target.type_name() == self.name {
            return Value::Object(crate::value::ObjectRef::from_arc(self));
        }
        Value::error(EvalError::UnsupportedType(format!("{} to {}", self.name, target)))
    }

    fn convert_to_native(&self, target: NativeTarget) -> Result<Box<dyn Any>, ConversionError> {
        if self.value.as_any().type_id() == target.id {
            return Ok(self.value.clone_reflect().into_any());
        }
        if target.is::<serde_json::Map<String, serde_json::Value>>() {
            return Ok(Box::new(self.fields()));
        }
        if target.is::<serde_json::Value>() {
            return Ok(Box::new(serde_json::Value::Object(self.fields())));
        }
        let mut pointee = None;
        crate::reflect::with_indirect(&*self.value, |v| {
            if v.as_any().type_id() == target.id {
                pointee = Some(v.clone_reflect().into_any());
            }
        });
        pointee.ok_or_else(|| ConversionError::Unsupported {
            from: self.name.to_string(),
            to: target.name.to_string(),
        })
    }

    fn to_json(&self) -> Result<serde_json::Value, ConversionError> {
        Ok(serde_json::Value::Object(self.fields()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
