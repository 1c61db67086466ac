//! Base adapter and provider: builtin types and structured messages.
//!
//! These terminate a provider chain. Anything they don't know becomes an
//! error value (adapter) or `None` (provider).

use std::sync::Arc;

use crate::decls::{self, DeclType};
use crate::error::EvalError;
use crate::message::MessageObject;
use crate::provider::{FieldType, Native, TypeAdapter, TypeProvider};
use crate::reflect::{HostType, Reflect, View};
use crate::type_value::TypeValue;
use crate::value::{ListValue, MapValue, ObjectRef, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct BaseAdapter;

impl BaseAdapter {
    pub fn new() -> Self {
        BaseAdapter
    }

    fn lift(&self, value: Arc<dyn Reflect>) -> Value {
        match value.view() {
            View::Bool(b) => Value::Bool(b),
            View::Int(i) => Value::Int(i),
            View::Uint(u) => Value::Uint(u),
            View::Double(d) => Value::Double(d),
            View::String(s) => Value::String(s.to_string()),
            View::Bytes(b) => Value::Bytes(b.to_vec()),
            View::Duration(d) => Value::Duration(d),
            View::Timestamp(t) => Value::Timestamp(t),
            View::List(list) => Value::List(ListValue::from_values(
                (0..list.len())
                    .filter_map(|i| list.element(i))
                    .map(|e| self.lift(Arc::from(e.clone_reflect())))
                    .collect(),
            )),
            View::Map(map) => Value::Map(MapValue::from_entries(
                map.entries()
                    .into_iter()
                    .map(|(k, v)| {
                        (
                            self.lift(Arc::from(k.clone_reflect())),
                            self.lift(Arc::from(v.clone_reflect())),
                        )
                    })
                    .collect(),
            )),
            View::Message(_) => self.lift_message(Arc::clone(&value)),
            View::Pointer(ptr) => {
                if ptr.is_null() {
                    return Value::Null;
                }
                // Messages keep their pointer so conversions can hand it back.
                if matches!(value.host_type().indirect(), HostType::Message(_)) {
                    return self.lift_message(Arc::clone(&value));
                }
                let mut lifted = Value::Null;
                ptr.with_pointee(&mut |inner| {
                    lifted = match inner.view() {
                        View::Pointer(_) => unsupported(inner),
                        _ => self.lift(Arc::from(inner.clone_reflect())),
                    };
                });
                lifted
            }
            View::Struct(_) | View::Opaque => unsupported(&*value),
        }
    }

    fn lift_message(&self, value: Arc<dyn Reflect>) -> Value {
        match MessageObject::new(value) {
            Some(msg) => Value::Object(ObjectRef::new(msg)),
            None => Value::Null,
        }
    }
}

fn unsupported(value: &dyn Reflect) -> Value {
    Value::error(EvalError::UnsupportedType(value.host_type().to_string()))
}

impl TypeAdapter for BaseAdapter {
    fn native_to_value(&self, value: Native) -> Value {
        match value {
            Native::Null => Value::Null,
            Native::Value(v) => v,
            Native::Host(host) => self.lift(host),
        }
    }
}

/// Knows the builtin type names only.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseProvider;

impl BaseProvider {
    pub fn new() -> Self {
        BaseProvider
    }
}

impl TypeProvider for BaseProvider {
    fn enum_value(&self, name: &str) -> Value {
        Value::error(EvalError::UnknownType(format!("enum {}", name)))
    }

    fn find_ident(&self, name: &str) -> Option<Value> {
        TypeValue::builtin(name).map(Value::Type)
    }

    fn find_type(&self, name: &str) -> Option<DeclType> {
        DeclType::builtin(name).map(decls::type_type)
    }

    fn find_field_type(&self, _type_name: &str, _field: &str) -> Option<FieldType> {
        None
    }

    fn new_value(&self, type_name: &str, _fields: &[(String, Value)]) -> Value {
        Value::error(EvalError::UnknownType(type_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::shared;

    #[test]
    fn lifts_primitives_and_containers() {
        let adapter = BaseAdapter::new();
        assert_eq!(adapter.native_to_value(Native::host(5u16)), Value::Uint(5));
        assert_eq!(adapter.native_to_value(Native::host(vec![1u8])), Value::Bytes(vec![1]));
        let list = adapter.native_to_value(Native::host(vec!["a".to_string()]));
        assert_eq!(list.as_list().map(|l| l.size()), Some(1));
    }

    #[test]
    fn resolves_one_pointer_level() {
        let adapter = BaseAdapter::new();
        assert_eq!(adapter.native_to_value(Native::host(shared(true))), Value::Bool(true));
        assert_eq!(adapter.native_to_value(Native::host(Option::<crate::Shared<i64>>::None)), Value::Null);
        assert!(adapter.native_to_value(Native::host(shared(shared(1i64)))).is_error());
    }

    #[test]
    fn provider_knows_builtins_only() {
        let provider = BaseProvider::new();
        assert_eq!(provider.find_type("int"), Some(decls::type_type(decls::INT)));
        assert!(provider.find_ident("uint").is_some());
        assert!(provider.find_type("identity.Account").is_none());
        assert!(provider.new_value("identity.Account", &[]).is_error());
    }
}
