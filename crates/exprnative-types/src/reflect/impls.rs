//! [`Reflect`] and [`Typed`] for std and chrono types.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::mpsc::{Sender, SyncSender};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::{
    shared, FromValue, HostType, Reflect, ReflectList, ReflectMap, ReflectPointer, Shared, Typed,
    View,
};
use crate::value::Value;

fn is_u8<T: 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<u8>()
}

fn downcast_eq<T: PartialEq + 'static>(this: &T, other: &dyn Reflect) -> bool {
    other.as_any().downcast_ref::<T>() == Some(this)
}

// ============================================================================
// Scalars
// ============================================================================

macro_rules! reflect_scalar {
    ($ty:ty, $host:expr, $zero:expr, |$v:ident| $view:expr) => {
        impl Reflect for $ty {
            crate::__reflect_basics!();

            fn is_zero(&self) -> bool {
                *self == $zero
            }

            fn reflect_eq(&self, other: &dyn Reflect) -> bool {
                downcast_eq(self, other)
            }

            fn view(&self) -> View<'_> {
                let $v = self;
                $view
            }
        }

        impl Typed for $ty {
            fn type_of() -> HostType {
                $host
            }

            fn zero() -> Self {
                $zero
            }
        }
    };
}

reflect_scalar!(bool, HostType::Bool, false, |v| View::Bool(*v));

reflect_scalar!(i8, HostType::Int { bits: 8 }, 0, |v| View::Int(i64::from(*v)));
reflect_scalar!(i16, HostType::Int { bits: 16 }, 0, |v| View::Int(i64::from(*v)));
reflect_scalar!(i32, HostType::Int { bits: 32 }, 0, |v| View::Int(i64::from(*v)));
reflect_scalar!(i64, HostType::Int { bits: 64 }, 0, |v| View::Int(*v));
reflect_scalar!(isize, HostType::Int { bits: 64 }, 0, |v| View::Int(*v as i64));

reflect_scalar!(u8, HostType::Uint { bits: 8 }, 0, |v| View::Uint(u64::from(*v)));
reflect_scalar!(u16, HostType::Uint { bits: 16 }, 0, |v| View::Uint(u64::from(*v)));
reflect_scalar!(u32, HostType::Uint { bits: 32 }, 0, |v| View::Uint(u64::from(*v)));
reflect_scalar!(u64, HostType::Uint { bits: 64 }, 0, |v| View::Uint(*v));
reflect_scalar!(usize, HostType::Uint { bits: 64 }, 0, |v| View::Uint(*v as u64));

reflect_scalar!(f32, HostType::Float { bits: 32 }, 0.0, |v| View::Double(f64::from(*v)));
reflect_scalar!(f64, HostType::Float { bits: 64 }, 0.0, |v| View::Double(*v));

reflect_scalar!(String, HostType::String, String::new(), |v| View::String(v.as_str()));

reflect_scalar!(Duration, HostType::Duration, Duration::zero(), |v| View::Duration(*v));
reflect_scalar!(
    DateTime<Utc>,
    HostType::Timestamp,
    DateTime::<Utc>::UNIX_EPOCH,
    |v| View::Timestamp(*v)
);

// ============================================================================
// Sequences
// ============================================================================

fn elements_eq<T: Reflect>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.reflect_eq(y))
}

impl<T: Typed> Reflect for Vec<T> {
    crate::__reflect_basics!();

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn reflect_eq(&self, other: &dyn Reflect) -> bool {
        match other.as_any().downcast_ref::<Vec<T>>() {
            Some(other) => elements_eq(self, other),
            None => false,
        }
    }

    fn view(&self) -> View<'_> {
        match (self as &dyn Any).downcast_ref::<Vec<u8>>() {
            Some(bytes) => View::Bytes(bytes),
            None => View::List(self),
        }
    }
}

impl<T: Typed> Typed for Vec<T> {
    fn type_of() -> HostType {
        if is_u8::<T>() {
            HostType::Bytes
        } else {
            HostType::List(Box::new(T::type_of()))
        }
    }

    fn zero() -> Self {
        Vec::new()
    }
}

impl<T: Typed> ReflectList for Vec<T> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn element(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|e| e as &dyn Reflect)
    }
}

impl<T: Typed, const N: usize> Reflect for [T; N] {
    crate::__reflect_basics!();

    fn is_zero(&self) -> bool {
        self.iter().all(Reflect::is_zero)
    }

    fn reflect_eq(&self, other: &dyn Reflect) -> bool {
        match other.as_any().downcast_ref::<[T; N]>() {
            Some(other) => elements_eq(self, other),
            None => false,
        }
    }

    fn view(&self) -> View<'_> {
        match (self as &dyn Any).downcast_ref::<[u8; N]>() {
            Some(bytes) => View::Bytes(bytes),
            None => View::List(self),
        }
    }
}

impl<T: Typed, const N: usize> Typed for [T; N] {
    fn type_of() -> HostType {
        if is_u8::<T>() {
            HostType::Bytes
        } else {
            HostType::List(Box::new(T::type_of()))
        }
    }

    fn zero() -> Self {
        std::array::from_fn(|_| T::zero())
    }
}

impl<T: Typed, const N: usize> ReflectList for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn element(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|e| e as &dyn Reflect)
    }
}

// ============================================================================
// Maps
// ============================================================================

macro_rules! reflect_map {
    ($map:ident, $($bound:path),+) => {
        impl<K, V> Reflect for $map<K, V>
        where
            K: Typed + FromValue $(+ $bound)+,
            V: Typed,
        {
            crate::__reflect_basics!();

            fn is_zero(&self) -> bool {
                self.is_empty()
            }

            fn reflect_eq(&self, other: &dyn Reflect) -> bool {
                let Some(other) = other.as_any().downcast_ref::<$map<K, V>>() else {
                    return false;
                };
                self.len() == other.len()
                    && self.iter().all(|(k, v)| match other.get(k) {
                        Some(o) => v.reflect_eq(o),
                        None => false,
                    })
            }

            fn view(&self) -> View<'_> {
                View::Map(self)
            }
        }

        impl<K, V> Typed for $map<K, V>
        where
            K: Typed + FromValue $(+ $bound)+,
            V: Typed,
        {
            fn type_of() -> HostType {
                HostType::Map(Box::new(K::type_of()), Box::new(V::type_of()))
            }

            fn zero() -> Self {
                $map::new()
            }
        }

        impl<K, V> ReflectMap for $map<K, V>
        where
            K: Typed + FromValue $(+ $bound)+,
            V: Typed,
        {
            fn len(&self) -> usize {
                $map::len(self)
            }

            fn get(&self, key: &Value) -> Option<&dyn Reflect> {
                let key = K::from_value(key).ok()?;
                $map::get(self, &key).map(|v| v as &dyn Reflect)
            }

            fn entries(&self) -> Vec<(&dyn Reflect, &dyn Reflect)> {
                self.iter()
                    .map(|(k, v)| (k as &dyn Reflect, v as &dyn Reflect))
                    .collect()
            }
        }
    };
}

reflect_map!(HashMap, Eq, Hash);
reflect_map!(BTreeMap, Ord);

// ============================================================================
// Pointers
// ============================================================================

impl<T: Typed> Reflect for Shared<T> {
    crate::__reflect_basics!();

    fn is_zero(&self) -> bool {
        false
    }

    fn reflect_eq(&self, other: &dyn Reflect) -> bool {
        match other.as_any().downcast_ref::<Shared<T>>() {
            Some(other) => {
                Arc::ptr_eq(self, other) || self.read_recursive().reflect_eq(&*other.read_recursive())
            }
            None => false,
        }
    }

    fn view(&self) -> View<'_> {
        View::Pointer(self)
    }
}

impl<T: Typed> Typed for Shared<T> {
    fn type_of() -> HostType {
        HostType::Pointer(Box::new(T::type_of()))
    }

    fn zero() -> Self {
        shared(T::zero())
    }
}

impl<T: Typed> ReflectPointer for Shared<T> {
    fn with_pointee(&self, f: &mut dyn FnMut(&dyn Reflect)) -> bool {
        let guard = self.read_recursive();
        f(&*guard);
        true
    }

    fn alloc_zero(&self) -> Box<dyn Reflect> {
        Box::new(shared(T::zero()))
    }

    fn is_null(&self) -> bool {
        false
    }
}

impl<T: Typed> Reflect for Option<Shared<T>> {
    crate::__reflect_basics!();

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn reflect_eq(&self, other: &dyn Reflect) -> bool {
        match (self, other.as_any().downcast_ref::<Option<Shared<T>>>()) {
            (None, Some(None)) => true,
            (Some(a), Some(Some(b))) => a.reflect_eq(b),
            _ => false,
        }
    }

    fn view(&self) -> View<'_> {
        View::Pointer(self)
    }
}

impl<T: Typed> Typed for Option<Shared<T>> {
    fn type_of() -> HostType {
        HostType::Pointer(Box::new(T::type_of()))
    }

    fn zero() -> Self {
        None
    }
}

impl<T: Typed> ReflectPointer for Option<Shared<T>> {
    fn with_pointee(&self, f: &mut dyn FnMut(&dyn Reflect)) -> bool {
        match self {
            Some(ptr) => ptr.with_pointee(f),
            None => false,
        }
    }

    fn alloc_zero(&self) -> Box<dyn Reflect> {
        Box::new(shared(T::zero()))
    }

    fn is_null(&self) -> bool {
        self.is_none()
    }
}

// ============================================================================
// Unsupported kinds
// ============================================================================

// Present so structs holding them can still derive; the mapper hides them.
macro_rules! reflect_unsupported {
    ($kind:literal, <$($gen:ident),*> $ty:ty) => {
        impl<$($gen: Send + 'static),*> Reflect for Option<$ty> {
            crate::__reflect_basics!();

            fn is_zero(&self) -> bool {
                self.is_none()
            }

            fn reflect_eq(&self, other: &dyn Reflect) -> bool {
                self.is_none()
                    && matches!(other.as_any().downcast_ref::<Option<$ty>>(), Some(None))
            }

            fn view(&self) -> View<'_> {
                View::Opaque
            }
        }

        impl<$($gen: Send + 'static),*> Typed for Option<$ty> {
            fn type_of() -> HostType {
                HostType::Unsupported($kind)
            }

            fn zero() -> Self {
                None
            }
        }

        impl<$($gen: Send + 'static),*> FromValue for Option<$ty> {
            fn from_value(value: &Value) -> Result<Self, crate::ConversionError> {
                Err(crate::ConversionError::Unsupported {
                    from: value.type_value().type_name().to_string(),
                    to: $kind.to_string(),
                })
            }
        }
    };
}

reflect_unsupported!("func", <R> fn() -> R);
reflect_unsupported!("func", <A, R> fn(A) -> R);
reflect_unsupported!("func", <A, B, R> fn(A, B) -> R);
reflect_unsupported!("func", <A, B, C, R> fn(A, B, C) -> R);
reflect_unsupported!("chan", <T> Sender<T>);
reflect_unsupported!("chan", <T> SyncSender<T>);
