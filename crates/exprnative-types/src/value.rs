//! Runtime values

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::error::{ConversionError, EvalError};
use crate::type_value::{BuiltinType, TypeValue};

/// A value flowing through expression evaluation.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Duration(Duration),
    Timestamp(DateTime<Utc>),
    List(ListValue),
    Map(MapValue),
    Object(ObjectRef),
    Type(TypeValue),
    Error(EvalError),
}

impl Value {
    pub fn error(err: impl Into<EvalError>) -> Self {
        Value::Error(err.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Runtime type of this value.
    pub fn type_value(&self) -> TypeValue {
        let builtin = match self {
            Value::Null => BuiltinType::NULL,
            Value::Bool(_) => BuiltinType::BOOL,
            Value::Int(_) => BuiltinType::INT,
            Value::Uint(_) => BuiltinType::UINT,
            Value::Double(_) => BuiltinType::DOUBLE,
            Value::String(_) => BuiltinType::STRING,
            Value::Bytes(_) => BuiltinType::BYTES,
            Value::Duration(_) => BuiltinType::DURATION,
            Value::Timestamp(_) => BuiltinType::TIMESTAMP,
            Value::List(_) => BuiltinType::LIST,
            Value::Map(_) => BuiltinType::MAP,
            Value::Object(obj) => return obj.type_value(),
            Value::Type(_) => BuiltinType::TYPE,
            Value::Error(_) => BuiltinType::ERROR,
        };
        TypeValue::new(builtin)
    }

    /// Language equality. Objects compare through [`ObjectValue::equal`],
    /// errors never compare equal.
    pub fn equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.size() == b.size() && a.iter().zip(b.iter()).all(|(x, y)| x.equal(&y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.size() == b.size()
                    && a.entries().iter().all(|(k, v)| match b.find(k) {
                        Some(other) => v.equal(&other),
                        None => false,
                    })
            }
            (Value::Object(a), _) => a.equal(other),
            (Value::Type(a), Value::Type(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListValue> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Encode as the generic structured (JSON) value.
    pub fn to_json(&self) -> Result<serde_json::Value, ConversionError> {
        use serde_json::Value as Json;

        match self {
            Value::Null => Ok(Json::Null),
            Value::Bool(b) => Ok(Json::Bool(*b)),
            Value::Int(i) => Ok(Json::from(*i)),
            Value::Uint(u) => Ok(Json::from(*u)),
            Value::Double(d) => serde_json::Number::from_f64(*d)
                .map(Json::Number)
                .ok_or_else(|| ConversionError::Json(format!("double {}", d))),
            Value::String(s) => Ok(Json::String(s.clone())),
            Value::Bytes(b) => Ok(Json::String(
                base64::engine::general_purpose::STANDARD.encode(b),
            )),
            Value::Duration(d) => format_duration(d).map(Json::String),
            Value::Timestamp(t) => Ok(Json::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
            Value::List(list) => list
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.to_json()
                        .map_err(|e| ConversionError::IndexError(i, Box::new(e)))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            Value::Map(map) => {
                let mut out = serde_json::Map::new();
                for (key, value) in map.entries() {
                    let key = match key {
                        Value::String(s) => s,
                        Value::Int(i) => i.to_string(),
                        Value::Uint(u) => u.to_string(),
                        Value::Bool(b) => b.to_string(),
                        other => {
                            return Err(ConversionError::KeyError(Box::new(
                                ConversionError::mismatch("string", &other),
                            )))
                        }
                    };
                    let json = value
                        .to_json()
                        .map_err(|e| ConversionError::FieldError(key.clone(), Box::new(e)))?;
                    out.insert(key, json);
                }
                Ok(Json::Object(out))
            }
            Value::Object(obj) => obj.to_json(),
            Value::Type(t) => Err(ConversionError::Json(format!("type {}", t))),
            Value::Error(e) => Err(ConversionError::Json(format!("error: {}", e))),
        }
    }

    /// Lift a generic structured (JSON) value.
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else {
                    Value::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => {
                Value::List(ListValue::from_values(items.iter().map(Value::from_json).collect()))
            }
            Json::Object(fields) => Value::Map(MapValue::from_entries(
                fields
                    .iter()
                    .map(|(k, v)| (Value::String(k.clone()), Value::from_json(v)))
                    .collect(),
            )),
        }
    }
}

/// Duration in the structured JSON form: decimal seconds with an `s` suffix.
fn format_duration(d: &Duration) -> Result<String, ConversionError> {
    let nanos = d
        .num_nanoseconds()
        .ok_or_else(|| ConversionError::Json(format!("duration {}", d)))?;
    let sign = if nanos < 0 { "-" } else { "" };
    let abs = nanos.unsigned_abs();
    let secs = abs / 1_000_000_000;
    let frac = abs % 1_000_000_000;
    if frac == 0 {
        return Ok(format!("{}{}s", sign, secs));
    }
    let frac = format!("{:09}", frac);
    Ok(format!("{}{}.{}s", sign, secs, frac.trim_end_matches('0')))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Uint(u) => write!(f, "Uint({})", u),
            Value::Double(d) => write!(f, "Double({})", d),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Bytes(b) => write!(f, "Bytes({:?})", b),
            Value::Duration(d) => write!(f, "Duration({})", d),
            Value::Timestamp(t) => write!(f, "Timestamp({})", t),
            Value::List(l) => write!(f, "List({:?})", l),
            Value::Map(m) => write!(f, "Map({:?})", m),
            Value::Object(o) => write!(f, "Object({:?})", o),
            Value::Type(t) => write!(f, "{:?}", t),
            Value::Error(e) => write!(f, "Error({})", e),
        }
    }
}

// ============================================================================
// From implementations for primitives
// ============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Int(v) }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self { Value::Uint(v) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Double(v) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::String(v) }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::String(v.to_string()) }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self { Value::Bytes(v) }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self { Value::Duration(v) }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self { Value::Timestamp(v) }
}

impl From<EvalError> for Value {
    fn from(v: EvalError) -> Self { Value::Error(v) }
}

// ============================================================================
// Lists
// ============================================================================

/// Read access to a list, possibly a lazy view over host data.
pub trait Lister: Send + Sync {
    fn size(&self) -> usize;

    fn get(&self, index: usize) -> Option<Value>;
}

/// A list value. Cloning shares the underlying list.
#[derive(Clone)]
pub struct ListValue(Arc<dyn Lister>);

impl ListValue {
    pub fn new(list: impl Lister + 'static) -> Self {
        ListValue(Arc::new(list))
    }

    pub fn from_values(items: Vec<Value>) -> Self {
        ListValue::new(StaticList(items))
    }

    pub fn empty() -> Self {
        ListValue::from_values(Vec::new())
    }

    pub fn size(&self) -> usize {
        self.0.size()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.get(index)
    }

    /// Iterate the list. Every call starts over and reads the list afresh.
    pub fn iter(&self) -> ListIter<'_> {
        ListIter { list: self, index: 0 }
    }
}

impl fmt::Debug for ListValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

pub struct ListIter<'a> {
    list: &'a ListValue,
    index: usize,
}

impl Iterator for ListIter<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let item = self.list.get(self.index)?;
        self.index += 1;
        Some(item)
    }
}

struct StaticList(Vec<Value>);

impl Lister for StaticList {
    fn size(&self) -> usize {
        self.0.len()
    }

    fn get(&self, index: usize) -> Option<Value> {
        self.0.get(index).cloned()
    }
}

// ============================================================================
// Maps
// ============================================================================

/// Read access to a map, possibly a lazy view over host data.
pub trait Mapper: Send + Sync {
    fn size(&self) -> usize;

    fn find(&self, key: &Value) -> Option<Value>;

    /// Snapshot of the current entries.
    fn entries(&self) -> Vec<(Value, Value)>;
}

/// A map value. Cloning shares the underlying map.
#[derive(Clone)]
pub struct MapValue(Arc<dyn Mapper>);

impl MapValue {
    pub fn new(map: impl Mapper + 'static) -> Self {
        MapValue(Arc::new(map))
    }

    pub fn from_entries(entries: Vec<(Value, Value)>) -> Self {
        MapValue::new(StaticMap(entries))
    }

    pub fn empty() -> Self {
        MapValue::from_entries(Vec::new())
    }

    pub fn size(&self) -> usize {
        self.0.size()
    }

    pub fn find(&self, key: &Value) -> Option<Value> {
        self.0.find(key)
    }

    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0.entries()
    }
}

impl fmt::Debug for MapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

struct StaticMap(Vec<(Value, Value)>);

impl Mapper for StaticMap {
    fn size(&self) -> usize {
        self.0.len()
    }

    fn find(&self, key: &Value) -> Option<Value> {
        self.0
            .iter()
            .find(|(k, _)| k.equal(key))
            .map(|(_, v)| v.clone())
    }

    fn entries(&self) -> Vec<(Value, Value)> {
        self.0.clone()
    }
}

// ============================================================================
// Objects
// ============================================================================

/// Identifies the host type a value should be converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTarget {
    pub id: TypeId,
    pub name: &'static str,
}

impl NativeTarget {
    pub fn of<T: Any>() -> Self {
        NativeTarget {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

/// An object-typed runtime value: a host struct, a structured message, ...
pub trait ObjectValue: Send + Sync + fmt::Debug {
    fn type_value(&self) -> TypeValue;

    /// Read a field. Fails with an error value for unknown fields.
    fn get(&self, field: &Value) -> Value;

    /// Whether a field is set to a non-zero value.
    fn is_set(&self, field: &Value) -> Value;

    fn is_zero_value(&self) -> bool;

    fn equal(&self, other: &Value) -> bool;

    fn convert_to_type(self: Arc<Self>, target: &TypeValue) -> Value;

    /// Convert into the host type identified by `target`. The returned box
    /// holds a value of exactly that type.
    fn convert_to_native(&self, target: NativeTarget) -> Result<Box<dyn Any>, ConversionError>;

    fn to_json(&self) -> Result<serde_json::Value, ConversionError>;

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to an [`ObjectValue`].
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn ObjectValue>);

impl ObjectRef {
    pub fn new(obj: impl ObjectValue + 'static) -> Self {
        ObjectRef(Arc::new(obj))
    }

    pub fn from_arc(obj: Arc<dyn ObjectValue>) -> Self {
        ObjectRef(obj)
    }

    pub fn type_value(&self) -> TypeValue {
        self.0.type_value()
    }

    pub fn get(&self, field: &Value) -> Value {
        self.0.get(field)
    }

    pub fn is_set(&self, field: &Value) -> Value {
        self.0.is_set(field)
    }

    pub fn is_zero_value(&self) -> bool {
        self.0.is_zero_value()
    }

    pub fn equal(&self, other: &Value) -> bool {
        self.0.equal(other)
    }

    pub fn convert_to_type(&self, target: &TypeValue) -> Value {
        Arc::clone(&self.0).convert_to_type(target)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, ConversionError> {
        self.0.to_json()
    }

    /// Convert into the host type `T`.
    pub fn convert_to_native<T: Any>(&self) -> Result<T, ConversionError> {
        let target = NativeTarget::of::<T>();
        let boxed = self.0.convert_to_native(target)?;
        boxed
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| ConversionError::Unsupported {
                from: self.type_value().type_name().to_string(),
                to: target.name.to_string(),
            })
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_scalars() {
        assert_eq!(Value::Int(-3).to_json().unwrap(), serde_json::json!(-3));
        assert_eq!(Value::Bytes(b"hi".to_vec()).to_json().unwrap(), serde_json::json!("aGk="));
        assert_eq!(
            Value::Duration(Duration::milliseconds(1500)).to_json().unwrap(),
            serde_json::json!("1.5s")
        );
        assert_eq!(
            Value::Timestamp(DateTime::<Utc>::UNIX_EPOCH).to_json().unwrap(),
            serde_json::json!("1970-01-01T00:00:00Z")
        );
        assert!(Value::Double(f64::NAN).to_json().is_err());
    }

    #[test]
    fn json_roundtrip_containers() {
        let json = serde_json::json!({"a": [1, 2], "b": {"c": true}});
        let value = Value::from_json(&json);
        assert_eq!(value.to_json().unwrap(), json);
    }

    #[test]
    fn map_equality_ignores_order() {
        let a = MapValue::from_entries(vec![("x".into(), 1i64.into()), ("y".into(), 2i64.into())]);
        let b = MapValue::from_entries(vec![("y".into(), 2i64.into()), ("x".into(), 1i64.into())]);
        assert_eq!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn errors_never_equal() {
        let err = Value::error(EvalError::NoSuchField("x".into()));
        assert_ne!(err.clone(), err);
    }

    #[test]
    fn list_iteration_restarts() {
        let list = ListValue::from_values(vec![1i64.into(), 2i64.into()]);
        assert_eq!(list.iter().count(), 2);
        assert_eq!(list.iter().count(), 2);
    }
}
