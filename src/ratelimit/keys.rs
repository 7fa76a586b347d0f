//! Opaque counter identifiers.
//!
//! Namespaces and entity keys arrive already salted and hashed; nothing in
//! the rate limiting core decodes or interprets them.

use std::fmt;

/// Identifies one (application, event) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies the thing being limited within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key identifying one counter record in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterKey<'a> {
    pub namespace: &'a Namespace,
    pub entity: &'a EntityKey,
}

impl<'a> CounterKey<'a> {
    pub fn new(namespace: &'a Namespace, entity: &'a EntityKey) -> Self {
        Self { namespace, entity }
    }

    /// Convert to a store key.
    /// Format: "{prefix}{namespace}:{entity}"
    pub fn to_store_key(&self, prefix: &str) -> String {
        format!("{}{}:{}", prefix, self.namespace, self.entity)
    }
}
