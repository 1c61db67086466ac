//! Externally visible field values.
//!
//! A field at its zero value reads as a language default instead of the raw
//! host zero, so containers and structs never surface as nulls:
//!
//! | zero field | reads as |
//! |------------|----------|
//! | list | empty list |
//! | map | empty map |
//! | timestamp | Unix epoch |
//! | struct | fresh zero instance |
//! | null pointer | fresh pointer to a zero pointee |
//!
//! Everything else passes through and is lifted as-is.

use chrono::{DateTime, Utc};
use exprnative_types::reflect::{with_indirect, Reflect, StructInfo, View};
use exprnative_types::{HostType, ListValue, MapValue, Native, TypeAdapter, Value};

use crate::registry::NativeTypeProvider;

/// Normalized copy of a field value, ready to lift.
pub fn normalize(field: &dyn Reflect) -> Native {
    if !field.is_zero() {
        return Native::from_boxed(field.clone_reflect());
    }
    match field.host_type() {
        HostType::List(_) => Native::Value(Value::List(ListValue::empty())),
        HostType::Map(_, _) => Native::Value(Value::Map(MapValue::empty())),
        HostType::Timestamp => Native::Value(Value::Timestamp(DateTime::<Utc>::UNIX_EPOCH)),
        HostType::Struct(info) => Native::from_boxed((info.new_zero)()),
        HostType::Pointer(_) => match field.view() {
            View::Pointer(ptr) => Native::from_boxed(ptr.alloc_zero()),
            _ => Native::from_boxed(field.clone_reflect()),
        },
        _ => Native::from_boxed(field.clone_reflect()),
    }
}

/// Run `f` on field `index` of an instance of `info`, through one pointer
/// level. `None` for a null pointer, an instance of another type or an
/// opaque field.
pub(crate) fn with_field<R>(
    instance: &dyn Reflect,
    info: &'static StructInfo,
    index: usize,
    f: impl FnOnce(&dyn Reflect) -> R,
) -> Option<R> {
    with_indirect(instance, |value| match value.view() {
        View::Struct(s) if s.info().type_id == info.type_id => s.field(index).map(f),
        _ => None,
    })
    .flatten()
}

/// Read field `index` of an instance, normalized and lifted.
pub fn field_value(
    adapter: &NativeTypeProvider,
    instance: &dyn Reflect,
    info: &'static StructInfo,
    index: usize,
) -> Option<Value> {
    // Copy out under the read lock, lift after releasing it.
    let native = with_field(instance, info, index, normalize)?;
    Some(adapter.native_to_value(native))
}

/// Whether field `index` holds a non-zero value.
pub fn field_is_set(instance: &dyn Reflect, info: &'static StructInfo, index: usize) -> bool {
    with_field(instance, info, index, |f| !f.is_zero()).unwrap_or(false)
}
