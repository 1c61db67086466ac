//! Host shape -> declared type.

use exprnative_types::decls::{self, list_of, map_of, object_type};
use exprnative_types::{DeclType, HostType};

use crate::config::NativeTypesConfig;
use crate::error::UnsupportedFieldKind;

/// Declared type of a host type.
///
/// One level of pointer indirection is unwrapped; a pointer to a structured
/// message maps to the message name. Pointers to pointers, functions,
/// channels and opaque fields are unsupported, and so is any container that
/// holds them.
pub fn decl_type_of(
    ty: &HostType,
    config: &NativeTypesConfig,
) -> Result<DeclType, UnsupportedFieldKind> {
    match ty {
        HostType::Pointer(inner) => match inner.as_ref() {
            HostType::Pointer(_) => Err(UnsupportedFieldKind::new(ty.to_string())),
            HostType::Message(name) => Ok(object_type(*name)),
            pointee => decl_type_direct(pointee, config),
        },
        other => decl_type_direct(other, config),
    }
}

fn decl_type_direct(
    ty: &HostType,
    config: &NativeTypesConfig,
) -> Result<DeclType, UnsupportedFieldKind> {
    let decl = match ty {
        HostType::Bool => decls::BOOL,
        HostType::Int { .. } => decls::INT,
        HostType::Uint { .. } => decls::UINT,
        HostType::Float { .. } => decls::DOUBLE,
        HostType::String => decls::STRING,
        HostType::Bytes => decls::BYTES,
        HostType::Duration => decls::DURATION,
        HostType::Timestamp => decls::TIMESTAMP,
        HostType::List(elem) => list_of(decl_type_of(elem, config)?),
        // Key kinds are not restricted here.
        HostType::Map(key, value) => map_of(decl_type_of(key, config)?, decl_type_of(value, config)?),
        HostType::Struct(info) => object_type(config.qualified_name(info)),
        HostType::Message(name) => object_type(*name),
        HostType::Pointer(_) | HostType::Unsupported(_) => {
            return Err(UnsupportedFieldKind::new(ty.to_string()))
        }
    };
    Ok(decl)
}
