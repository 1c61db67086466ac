//! The native type registry.
//!
//! [`NativeTypeProvider`] owns the registered struct types and sits in front
//! of a fallback adapter and provider: names and values it does not own are
//! passed down the chain unchanged.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use exprnative_types::decls::{object_type, type_type};
use exprnative_types::reflect::{Reflect, StructInfo, Typed, View};
use exprnative_types::{
    BaseAdapter, BaseProvider, DeclType, EvalError, FieldType, HostType, ListValue, MapValue,
    Native, ObjectRef, TypeAdapter, TypeProvider, TypeValue, Value,
};
use tracing::{debug, trace, warn};

use crate::config::NativeTypesConfig;
use crate::descriptor::NativeType;
use crate::error::RegistryError;
use crate::normalize::{field_is_set, field_value};
use crate::object::NativeObject;
use crate::views::{NativeList, NativeMap};

/// One thing to register: a host type, or a host value standing for its type.
#[derive(Debug, Clone)]
pub enum RegisterArg {
    Type(HostType),
    Value(Arc<dyn Reflect>),
}

impl RegisterArg {
    pub fn of<T: Typed>() -> Self {
        RegisterArg::Type(T::type_of())
    }

    pub fn value<T: Reflect>(value: T) -> Self {
        RegisterArg::Value(Arc::new(value))
    }

    /// Accept a dynamically typed argument holding a [`RegisterArg`], a
    /// [`HostType`], an `Arc<dyn Reflect>` or a `Box<dyn Reflect>`.
    pub fn from_any(arg: Box<dyn Any>) -> Result<Self, RegistryError> {
        let arg = match arg.downcast::<RegisterArg>() {
            Ok(arg) => return Ok(*arg),
            Err(arg) => arg,
        };
        let arg = match arg.downcast::<HostType>() {
            Ok(ty) => return Ok(RegisterArg::Type(*ty)),
            Err(arg) => arg,
        };
        let arg = match arg.downcast::<Arc<dyn Reflect>>() {
            Ok(value) => return Ok(RegisterArg::Value(*value)),
            Err(arg) => arg,
        };
        match arg.downcast::<Box<dyn Reflect>>() {
            Ok(value) => Ok(RegisterArg::Value(Arc::from(*value))),
            Err(arg) => Err(RegistryError::UnsupportedArgument(format!("{:?}", (*arg).type_id()))),
        }
    }

    fn host_type(&self) -> HostType {
        match self {
            RegisterArg::Type(ty) => ty.clone(),
            RegisterArg::Value(value) => value.host_type(),
        }
    }
}

struct Inner {
    types: HashMap<String, Arc<NativeType>>,
    base_adapter: Arc<dyn TypeAdapter>,
    base_provider: Arc<dyn TypeProvider>,
    config: NativeTypesConfig,
}

/// Registry of native struct types.
///
/// Immutable once built; clones share the same table.
#[derive(Clone)]
pub struct NativeTypeProvider {
    inner: Arc<Inner>,
}

impl NativeTypeProvider {
    /// Register `args` in order, composing over `adapter` and `provider`.
    ///
    /// Fails on the first argument that is not a struct after one pointer
    /// level. A later registration of the same name replaces an earlier one.
    pub fn new(
        adapter: Arc<dyn TypeAdapter>,
        provider: Arc<dyn TypeProvider>,
        config: NativeTypesConfig,
        args: impl IntoIterator<Item = RegisterArg>,
    ) -> Result<Self, RegistryError> {
        let mut types: HashMap<String, Arc<NativeType>> = HashMap::new();

        for arg in args {
            let ty = NativeType::new(&arg.host_type(), &config)?;
            let name = ty.type_name().to_string();
            debug!(type_name = %name, shape = %ty.shape_hash(), "registering native type");
            if let Some(previous) = types.get(&name) {
                if previous.shape_hash() != ty.shape_hash() {
                    warn!(
                        type_name = %name,
                        previous = %previous.shape_hash(),
                        replacement = %ty.shape_hash(),
                        "native type re-registered with a different shape"
                    );
                }
            }
            types.insert(name, Arc::new(ty));
        }

        Ok(NativeTypeProvider {
            inner: Arc::new(Inner {
                types,
                base_adapter: adapter,
                base_provider: provider,
                config,
            }),
        })
    }

    pub fn native_type(&self, name: &str) -> Option<&Arc<NativeType>> {
        self.inner.types.get(name)
    }

    /// Registered types, sorted by name.
    pub fn types(&self) -> Vec<&Arc<NativeType>> {
        let mut types: Vec<_> = self.inner.types.values().collect();
        types.sort_by(|a, b| a.type_name().cmp(b.type_name()));
        types
    }

    pub fn config(&self) -> &NativeTypesConfig {
        &self.inner.config
    }

    /// Lift a host value. Same as [`TypeAdapter::native_to_value`].
    pub fn to_value(&self, value: Native) -> Value {
        self.native_to_value(value)
    }

    /// The registered descriptor when it describes this exact type, else a
    /// fresh one. Unregistered structs pay for a field table and a shape
    /// hash on every lift.
    fn descriptor_for(&self, info: &'static StructInfo) -> Arc<NativeType> {
        let name = self.inner.config.qualified_name(info);
        match self.inner.types.get(&name) {
            Some(ty) if ty.info().type_id == info.type_id => Arc::clone(ty),
            _ => Arc::new(NativeType::from_info(info, &self.inner.config)),
        }
    }

    fn lift_host(&self, host: Arc<dyn Reflect>) -> Value {
        if let View::Pointer(ptr) = host.view() {
            if ptr.is_null() {
                return Value::Null;
            }
        }
        match host.host_type().indirect() {
            HostType::List(_) => Value::List(ListValue::new(NativeList::new(self.clone(), host))),
            HostType::Map(_, _) => Value::Map(MapValue::new(NativeMap::new(self.clone(), host))),
            HostType::Struct(info) => {
                let ty = self.descriptor_for(info);
                Value::Object(ObjectRef::new(NativeObject::new(self.clone(), host, ty)))
            }
            // Bytes, messages, timestamps and the remaining scalars.
            _ => self.inner.base_adapter.native_to_value(Native::Host(host)),
        }
    }
}

impl fmt::Debug for NativeTypeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeTypeProvider")
            .field("types", &self.types().iter().map(|t| t.type_name()).collect::<Vec<_>>())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl TypeAdapter for NativeTypeProvider {
    fn native_to_value(&self, value: Native) -> Value {
        match value {
            Native::Null => Value::Null,
            Native::Value(value) => value,
            Native::Host(host) => self.lift_host(host),
        }
    }
}

impl TypeProvider for NativeTypeProvider {
    fn enum_value(&self, name: &str) -> Value {
        self.inner.base_provider.enum_value(name)
    }

    fn find_ident(&self, name: &str) -> Option<Value> {
        match self.inner.types.get(name) {
            Some(ty) => Some(Value::Type(TypeValue::from_arc(ty.clone()))),
            None => {
                trace!(name, "identifier not native, delegating");
                self.inner.base_provider.find_ident(name)
            }
        }
    }

    fn find_type(&self, name: &str) -> Option<DeclType> {
        if self.inner.types.contains_key(name) {
            return Some(type_type(object_type(name)));
        }
        trace!(name, "type not native, delegating");
        self.inner.base_provider.find_type(name)
    }

    fn find_field_type(&self, type_name: &str, field: &str) -> Option<FieldType> {
        let Some(ty) = self.inner.types.get(type_name) else {
            return self.inner.base_provider.find_field_type(type_name, field);
        };
        let visible = ty.has_field(field)?;
        let info = ty.info();
        let index = visible.info.index;
        let name = visible.name.clone();
        let adapter = self.clone();

        Some(FieldType {
            decl: visible.decl.clone(),
            is_set: Arc::new(move |instance: &dyn Reflect| field_is_set(instance, info, index)),
            get_from: Arc::new(move |instance: &dyn Reflect| {
                field_value(&adapter, instance, info, index)
                    .ok_or_else(|| EvalError::NoSuchField(name.clone()))
            }),
        })
    }

    fn new_value(&self, type_name: &str, fields: &[(String, Value)]) -> Value {
        let Some(ty) = self.inner.types.get(type_name) else {
            return self.inner.base_provider.new_value(type_name, fields);
        };

        // Resolve and convert everything before allocating.
        let mut converted = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let Some(field) = ty.has_field(name) else {
                return Value::error(EvalError::NoSuchField(name.clone()));
            };
            match (field.info.convert)(value) {
                Ok(host) => converted.push((field.info, host)),
                Err(err) => return Value::error(err),
            }
        }

        let mut instance = (ty.info().new_zero)();
        for (field, host) in converted {
            if let Err(err) = (field.assign)(&mut *instance, host) {
                return Value::error(err);
            }
        }
        self.lift_host(Arc::from(instance))
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Typed front door to [`NativeTypeProvider::new`].
///
/// ```ignore
/// let provider = NativeTypes::new()
///     .register::<Account>()
///     .register::<Profile>()
///     .build_with_base()?;
/// ```
#[derive(Debug, Default)]
pub struct NativeTypes {
    args: Vec<RegisterArg>,
    config: NativeTypesConfig,
}

impl NativeTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Typed>(mut self) -> Self {
        self.args.push(RegisterArg::of::<T>());
        self
    }

    pub fn register_value<T: Reflect>(mut self, value: T) -> Self {
        self.args.push(RegisterArg::value(value));
        self
    }

    pub fn register_arg(mut self, arg: RegisterArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_config(mut self, config: NativeTypesConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(
        self,
        adapter: Arc<dyn TypeAdapter>,
        provider: Arc<dyn TypeProvider>,
    ) -> Result<NativeTypeProvider, RegistryError> {
        NativeTypeProvider::new(adapter, provider, self.config, self.args)
    }

    /// Build over the builtin [`BaseAdapter`] and [`BaseProvider`].
    pub fn build_with_base(self) -> Result<NativeTypeProvider, RegistryError> {
        self.build(Arc::new(BaseAdapter::new()), Arc::new(BaseProvider::new()))
    }
}
