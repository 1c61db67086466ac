//! Runtime type values and capability masks.

use std::any::Any;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

/// Capability mask a runtime type declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Traits(u32);

impl Traits {
    pub const NONE: Traits = Traits(0);
    /// Supports presence tests on fields (`has(x.f)`).
    pub const FIELD_TESTER: Traits = Traits(1 << 0);
    /// Supports field / index access.
    pub const INDEXER: Traits = Traits(1 << 1);
    pub const ITERATOR: Traits = Traits(1 << 2);
    pub const SIZER: Traits = Traits(1 << 3);

    pub const fn union(self, other: Traits) -> Traits {
        Traits(self.0 | other.0)
    }

    /// True if every capability in `other` is present.
    pub const fn contains(self, other: Traits) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Traits {
    type Output = Traits;

    fn bitor(self, rhs: Traits) -> Traits {
        self.union(rhs)
    }
}

/// A type known to the runtime.
pub trait RuntimeType: Send + Sync + fmt::Debug {
    fn type_name(&self) -> &str;

    fn has_trait(&self, traits: Traits) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// A runtime type as a value. Two type values are equal when their names are.
#[derive(Clone)]
pub struct TypeValue(Arc<dyn RuntimeType>);

impl TypeValue {
    pub fn new(ty: impl RuntimeType + 'static) -> Self {
        TypeValue(Arc::new(ty))
    }

    pub fn from_arc(ty: Arc<dyn RuntimeType>) -> Self {
        TypeValue(ty)
    }

    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }

    pub fn has_trait(&self, traits: Traits) -> bool {
        self.0.has_trait(traits)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Whether this is the type of types.
    pub fn is_type_type(&self) -> bool {
        self.type_name() == BuiltinType::TYPE.name
    }

    pub fn type_type() -> Self {
        TypeValue::new(BuiltinType::TYPE)
    }

    /// Runtime type of a builtin type name.
    pub fn builtin(name: &str) -> Option<Self> {
        BuiltinType::ALL
            .iter()
            .find(|t| t.name == name)
            .map(|t| TypeValue::new(*t))
    }
}

impl PartialEq for TypeValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name()
    }
}

impl fmt::Debug for TypeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.type_name())
    }
}

impl fmt::Display for TypeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// The closed set of types built into the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinType {
    pub name: &'static str,
    pub traits: Traits,
}

impl BuiltinType {
    pub const NULL: BuiltinType = BuiltinType::plain("null_type");
    pub const BOOL: BuiltinType = BuiltinType::plain("bool");
    pub const INT: BuiltinType = BuiltinType::plain("int");
    pub const UINT: BuiltinType = BuiltinType::plain("uint");
    pub const DOUBLE: BuiltinType = BuiltinType::plain("double");
    pub const STRING: BuiltinType = BuiltinType::plain("string");
    pub const BYTES: BuiltinType = BuiltinType::plain("bytes");
    pub const DURATION: BuiltinType = BuiltinType::plain("duration");
    pub const TIMESTAMP: BuiltinType = BuiltinType::plain("timestamp");
    pub const LIST: BuiltinType = BuiltinType {
        name: "list",
        traits: Traits::INDEXER.union(Traits::ITERATOR).union(Traits::SIZER),
    };
    pub const MAP: BuiltinType = BuiltinType {
        name: "map",
        traits: Traits::INDEXER.union(Traits::ITERATOR).union(Traits::SIZER),
    };
    pub const TYPE: BuiltinType = BuiltinType::plain("type");
    pub const ERROR: BuiltinType = BuiltinType::plain("error");

    pub const ALL: [BuiltinType; 13] = [
        Self::NULL,
        Self::BOOL,
        Self::INT,
        Self::UINT,
        Self::DOUBLE,
        Self::STRING,
        Self::BYTES,
        Self::DURATION,
        Self::TIMESTAMP,
        Self::LIST,
        Self::MAP,
        Self::TYPE,
        Self::ERROR,
    ];

    const fn plain(name: &'static str) -> Self {
        BuiltinType {
            name,
            traits: Traits::NONE,
        }
    }
}

impl RuntimeType for BuiltinType {
    fn type_name(&self) -> &str {
        self.name
    }

    fn has_trait(&self, traits: Traits) -> bool {
        self.traits.contains(traits)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
