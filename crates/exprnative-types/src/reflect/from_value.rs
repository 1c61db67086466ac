use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use chrono::{DateTime, Duration, Utc};

use super::{shared, Shared, Typed};
use crate::error::ConversionError;
use crate::value::Value;

/// Convert a runtime value into a host value.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

// ============================================================================
// Primitives
// ============================================================================

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(ConversionError::mismatch("bool", other)),
        }
    }
}

macro_rules! from_value_int {
    ($variant:ident, $expected:literal, $($ty:ty),*) => {$(
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, ConversionError> {
                match value {
                    Value::$variant(n) => <$ty>::try_from(*n).map_err(|_| ConversionError::OutOfRange {
                        value: n.to_string(),
                        target: stringify!($ty),
                    }),
                    other => Err(ConversionError::mismatch($expected, other)),
                }
            }
        }
    )*};
}

from_value_int!(Int, "int", i8, i16, i32, i64, isize);
from_value_int!(Uint, "uint", u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Double(d) => Ok(*d),
            other => Err(ConversionError::mismatch("double", other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Double(d) => Ok(*d as f32),
            other => Err(ConversionError::mismatch("double", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(ConversionError::mismatch("string", other)),
        }
    }
}

impl FromValue for Duration {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Duration(d) => Ok(*d),
            other => Err(ConversionError::mismatch("duration", other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Timestamp(t) => Ok(*t),
            other => Err(ConversionError::mismatch("timestamp", other)),
        }
    }
}

// ============================================================================
// Sequences
// ============================================================================

impl<T: Typed + FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            // Only `Vec<u8>` takes bytes; the downcast fails for any other T.
            Value::Bytes(bytes) => {
                let boxed: Box<dyn Any> = Box::new(bytes.clone());
                boxed
                    .downcast::<Vec<T>>()
                    .map(|v| *v)
                    .map_err(|_| ConversionError::mismatch("list", value))
            }
            Value::List(list) => list
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    T::from_value(&item).map_err(|e| ConversionError::IndexError(i, Box::new(e)))
                })
                .collect(),
            other => Err(ConversionError::mismatch("list", other)),
        }
    }
}

impl<T: Typed + FromValue, const N: usize> FromValue for [T; N] {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        let items = Vec::<T>::from_value(value)?;
        let got = items.len();
        items
            .try_into()
            .map_err(|_| ConversionError::WrongLength { expected: N, got })
    }
}

// ============================================================================
// Maps
// ============================================================================

fn convert_entries<K: FromValue, V: FromValue>(
    value: &Value,
) -> Result<impl Iterator<Item = Result<(K, V), ConversionError>>, ConversionError> {
    let map = match value {
        Value::Map(map) => map,
        other => return Err(ConversionError::mismatch("map", other)),
    };
    Ok(map.entries().into_iter().map(|(k, v)| {
        let key = K::from_value(&k).map_err(|e| ConversionError::KeyError(Box::new(e)))?;
        let value =
            V::from_value(&v).map_err(|e| ConversionError::FieldError(format!("{:?}", k), Box::new(e)))?;
        Ok((key, value))
    }))
}

impl<K, V> FromValue for HashMap<K, V>
where
    K: FromValue + Eq + Hash,
    V: FromValue,
{
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        convert_entries(value)?.collect()
    }
}

impl<K, V> FromValue for BTreeMap<K, V>
where
    K: FromValue + Ord,
    V: FromValue,
{
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        convert_entries(value)?.collect()
    }
}

// ============================================================================
// Pointers
// ============================================================================

impl<T: Typed + FromValue> FromValue for Shared<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        // Keep the object's own pointer when it has one.
        if let Value::Object(obj) = value {
            if let Ok(ptr) = obj.convert_to_native::<Shared<T>>() {
                return Ok(ptr);
            }
        }
        T::from_value(value).map(shared)
    }
}

impl<T: Typed + FromValue> FromValue for Option<Shared<T>> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => Shared::<T>::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ListValue, MapValue};

    #[test]
    fn ints_are_range_checked() {
        assert_eq!(i8::from_value(&Value::Int(12)), Ok(12));
        assert!(matches!(
            i8::from_value(&Value::Int(300)),
            Err(ConversionError::OutOfRange { target: "i8", .. })
        ));
        assert!(matches!(
            u32::from_value(&Value::Int(1)),
            Err(ConversionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn bytes_only_into_byte_vectors() {
        let bytes = Value::Bytes(vec![1, 2, 3]);
        assert_eq!(Vec::<u8>::from_value(&bytes), Ok(vec![1, 2, 3]));
        assert_eq!(<[u8; 3]>::from_value(&bytes), Ok([1, 2, 3]));
        assert!(Vec::<i64>::from_value(&bytes).is_err());
    }

    #[test]
    fn list_errors_carry_index() {
        let list = Value::List(ListValue::from_values(vec![Value::Int(1), Value::from("x")]));
        assert!(matches!(
            Vec::<i64>::from_value(&list),
            Err(ConversionError::IndexError(1, _))
        ));
    }

    #[test]
    fn array_length_must_match() {
        let list = Value::List(ListValue::from_values(vec![Value::Int(1)]));
        assert_eq!(
            <[i64; 2]>::from_value(&list),
            Err(ConversionError::WrongLength { expected: 2, got: 1 })
        );
    }

    #[test]
    fn maps_and_null_pointers() {
        let map = Value::Map(MapValue::from_entries(vec![(Value::from("k"), Value::Int(5))]));
        let converted = BTreeMap::<String, i64>::from_value(&map).unwrap();
        assert_eq!(converted.get("k"), Some(&5));

        assert!(Option::<Shared<i64>>::from_value(&Value::Null).unwrap().is_none());
        let ptr = Option::<Shared<i64>>::from_value(&Value::Int(3)).unwrap().unwrap();
        assert_eq!(*ptr.read(), 3);
    }
}
