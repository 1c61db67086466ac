//! Registry configuration.

use std::collections::BTreeMap;
use std::path::Path;

use exprnative_types::reflect::{FieldInfo, StructInfo};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How host structs are named inside the language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeTypesConfig {
    /// Honor `#[native(rename = "...")]` on fields. When false, Rust field
    /// names are used as-is.
    pub parse_field_renames: bool,

    /// Package alias derived from the host type -> alias exposed to
    /// expressions.
    pub package_aliases: BTreeMap<String, String>,
}

impl Default for NativeTypesConfig {
    fn default() -> Self {
        NativeTypesConfig {
            parse_field_renames: true,
            package_aliases: BTreeMap::new(),
        }
    }
}

impl NativeTypesConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn package_alias<'a>(&'a self, package: &'a str) -> &'a str {
        self.package_aliases
            .get(package)
            .map(String::as_str)
            .unwrap_or(package)
    }

    /// `<alias>.<TypeName>` for a derived struct.
    pub fn qualified_name(&self, info: &StructInfo) -> String {
        format!("{}.{}", self.package_alias(info.package), info.name)
    }

    /// Name a field is reachable by.
    pub fn field_name(&self, field: &FieldInfo) -> &'static str {
        match field.rename {
            Some(rename) if self.parse_field_renames => rename,
            _ => field.name,
        }
    }
}
