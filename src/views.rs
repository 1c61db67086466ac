//! Lazy list and map views over host collections.
//!
//! Views keep the backing host value and read it on every access: sizes,
//! elements and entries are never cached, and elements are lifted only when
//! read. Backed by a `Shared` collection, a view observes writes made
//! through any other handle to it.

use std::fmt;
use std::sync::Arc;

use exprnative_types::reflect::{with_indirect, Reflect, ReflectList, ReflectMap, View};
use exprnative_types::value::{Lister, Mapper};
use exprnative_types::{Native, TypeAdapter, Value};

use crate::registry::NativeTypeProvider;

fn with_list<R>(backing: &dyn Reflect, f: impl FnOnce(&dyn ReflectList) -> R) -> Option<R> {
    with_indirect(backing, |value| match value.view() {
        View::List(list) => Some(f(list)),
        _ => None,
    })
    .flatten()
}

fn with_map<R>(backing: &dyn Reflect, f: impl FnOnce(&dyn ReflectMap) -> R) -> Option<R> {
    with_indirect(backing, |value| match value.view() {
        View::Map(map) => Some(f(map)),
        _ => None,
    })
    .flatten()
}

pub struct NativeList {
    adapter: NativeTypeProvider,
    backing: Arc<dyn Reflect>,
}

impl NativeList {
    pub fn new(adapter: NativeTypeProvider, backing: Arc<dyn Reflect>) -> Self {
        NativeList { adapter, backing }
    }
}

impl Lister for NativeList {
    fn size(&self) -> usize {
        with_list(&*self.backing, |list| list.len()).unwrap_or(0)
    }

    fn get(&self, index: usize) -> Option<Value> {
        let element = with_list(&*self.backing, |list| {
            list.element(index).map(|e| e.clone_reflect())
        })??;
        Some(self.adapter.native_to_value(Native::from_boxed(element)))
    }
}

impl fmt::Debug for NativeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeList").field("backing", &self.backing).finish()
    }
}

pub struct NativeMap {
    adapter: NativeTypeProvider,
    backing: Arc<dyn Reflect>,
}

impl NativeMap {
    pub fn new(adapter: NativeTypeProvider, backing: Arc<dyn Reflect>) -> Self {
        NativeMap { adapter, backing }
    }

    fn lift(&self, value: Box<dyn Reflect>) -> Value {
        self.adapter.native_to_value(Native::from_boxed(value))
    }
}

impl Mapper for NativeMap {
    fn size(&self) -> usize {
        with_map(&*self.backing, |map| map.len()).unwrap_or(0)
    }

    fn find(&self, key: &Value) -> Option<Value> {
        let value = with_map(&*self.backing, |map| map.get(key).map(|v| v.clone_reflect()))??;
        Some(self.lift(value))
    }

    fn entries(&self) -> Vec<(Value, Value)> {
        let raw = with_map(&*self.backing, |map| {
            map.entries()
                .into_iter()
                .map(|(k, v)| (k.clone_reflect(), v.clone_reflect()))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
        raw.into_iter()
            .map(|(k, v)| (self.lift(k), self.lift(v)))
            .collect()
    }
}

impl fmt::Debug for NativeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeMap").field("backing", &self.backing).finish()
    }
}
