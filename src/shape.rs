//! Merkle hashing of declared type shapes.
//!
//! Every declared type hashes to a fixed 256-bit value built bottom-up:
//!
//! - Primitives hash their tag alone
//! - Containers hash their tag and their component hashes:
//!   `hash(list(T)) = hash(LIST, hash(T))`
//! - Object references hash the referenced name; the referenced type's own
//!   fields are not followed, so recursive types hash finitely
//! - A struct shape hashes its qualified name and its visible fields in
//!   declaration order: `hash(STRUCT, name, [(field, hash(decl))...])`
//!
//! Two registrations of the same name with different shapes hash
//! differently, which is what the registry checks before overwriting.

use std::fmt;

use exprnative_types::DeclType;
use sha2::{Digest, Sha256};

/// A 256-bit shape hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeHash([u8; 32]);

impl ShapeHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// First 8 bytes as hex, for display.
    pub fn short(&self) -> String {
        self.0[..8].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for ShapeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

// ============================================================================
// Hash Builder
// ============================================================================

struct ShapeHasher {
    hasher: Sha256,
}

impl ShapeHasher {
    fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    fn tag(mut self, tag: u8) -> Self {
        self.hasher.update([tag]);
        self
    }

    /// Length-prefixed string.
    fn string(mut self, s: &str) -> Self {
        self.hasher.update((s.len() as u32).to_le_bytes());
        self.hasher.update(s.as_bytes());
        self
    }

    fn child(mut self, hash: &ShapeHash) -> Self {
        self.hasher.update(hash.as_bytes());
        self
    }

    fn count(mut self, n: usize) -> Self {
        self.hasher.update((n as u32).to_le_bytes());
        self
    }

    fn finish(self) -> ShapeHash {
        let result = self.hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        ShapeHash(bytes)
    }
}

// ============================================================================
// Hash Tags
// ============================================================================

const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_UINT: u8 = 0x03;
const TAG_DOUBLE: u8 = 0x04;
const TAG_STRING: u8 = 0x05;
const TAG_BYTES: u8 = 0x06;
const TAG_DURATION: u8 = 0x07;
const TAG_TIMESTAMP: u8 = 0x08;
const TAG_DYN: u8 = 0x09;
const TAG_NULL: u8 = 0x0a;
const TAG_LIST: u8 = 0x10;
const TAG_MAP: u8 = 0x11;
const TAG_OBJECT: u8 = 0x12;
const TAG_TYPE: u8 = 0x13;
const TAG_STRUCT: u8 = 0x14;

/// Hash a declared type.
pub fn hash_decl(decl: &DeclType) -> ShapeHash {
    let hasher = ShapeHasher::new();
    match decl {
        DeclType::Bool => hasher.tag(TAG_BOOL),
        DeclType::Int => hasher.tag(TAG_INT),
        DeclType::Uint => hasher.tag(TAG_UINT),
        DeclType::Double => hasher.tag(TAG_DOUBLE),
        DeclType::String => hasher.tag(TAG_STRING),
        DeclType::Bytes => hasher.tag(TAG_BYTES),
        DeclType::Duration => hasher.tag(TAG_DURATION),
        DeclType::Timestamp => hasher.tag(TAG_TIMESTAMP),
        DeclType::Dyn => hasher.tag(TAG_DYN),
        DeclType::Null => hasher.tag(TAG_NULL),
        DeclType::List(elem) => hasher.tag(TAG_LIST).child(&hash_decl(elem)),
        DeclType::Map(key, value) => hasher
            .tag(TAG_MAP)
            .child(&hash_decl(key))
            .child(&hash_decl(value)),
        DeclType::Object(name) => hasher.tag(TAG_OBJECT).string(name),
        DeclType::Type(inner) => hasher.tag(TAG_TYPE).child(&hash_decl(inner)),
    }
    .finish()
}

/// Hash a struct shape: qualified name plus visible fields in order.
pub fn hash_struct<'a>(
    name: &str,
    fields: impl ExactSizeIterator<Item = (&'a str, &'a DeclType)>,
) -> ShapeHash {
    let mut hasher = ShapeHasher::new()
        .tag(TAG_STRUCT)
        .string(name)
        .count(fields.len());

    for (field, decl) in fields {
        hasher = hasher.string(field).child(&hash_decl(decl));
    }

    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprnative_types::decls::{self, list_of, map_of, object_type};

    #[test]
    fn primitive_hashes_are_unique() {
        let primitives = [
            decls::BOOL,
            decls::INT,
            decls::UINT,
            decls::DOUBLE,
            decls::STRING,
            decls::BYTES,
            decls::DURATION,
            decls::TIMESTAMP,
            decls::DYN,
        ];
        let hashes: Vec<_> = primitives.iter().map(hash_decl).collect();
        for (i, a) in hashes.iter().enumerate() {
            for b in &hashes[i + 1..] {
                assert_ne!(a, b, "primitive hashes must be unique");
            }
        }
    }

    #[test]
    fn containers_hash_components() {
        assert_ne!(hash_decl(&list_of(decls::INT)), hash_decl(&list_of(decls::UINT)));
        assert_ne!(hash_decl(&list_of(decls::INT)), hash_decl(&decls::INT));
        assert_ne!(
            hash_decl(&map_of(decls::STRING, decls::INT)),
            hash_decl(&map_of(decls::INT, decls::STRING))
        );
    }

    #[test]
    fn struct_hash_is_stable_and_field_sensitive() {
        let id = decls::INT;
        let profile = object_type("identity.Profile");
        let a = hash_struct("identity.Account", [("id", &id), ("profile", &profile)].into_iter());
        let b = hash_struct("identity.Account", [("id", &id), ("profile", &profile)].into_iter());
        let c = hash_struct("identity.Account", [("id", &id)].into_iter());
        let d = hash_struct("identity.Account", [("ID", &id), ("profile", &profile)].into_iter());

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d, "field names are part of the shape");
    }

    #[test]
    fn hex_forms() {
        let hash = hash_decl(&decls::INT);
        assert_eq!(hash.to_hex().len(), 64);
        assert_eq!(hash.to_string(), hash.short());
        assert!(hash.to_hex().starts_with(&hash.short()));
    }
}
