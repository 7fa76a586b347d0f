//! Salted one-way hashing of identifiers.
//!
//! Two layers hash every identifier. The client SDK hashes app id, event
//! name and entities before they leave the caller's process and maps the
//! hashes back for display. The server salts those hashes again with its own
//! secret to derive namespaces and entity keys for the counting store.

use std::collections::HashMap;
use std::fmt::{self, Write};

use sha2::{Digest, Sha256};

use crate::ratelimit::{EntityKey, Namespace};

/// Lowercase hex SHA-256 of the concatenation of `parts`.
pub fn sha256_hex(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }

    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        // Writing into a String cannot fail
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Secret prepended to every hashed value.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt(String);

impl Salt {
    pub fn new(salt: impl Into<String>) -> Self {
        Self(salt.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}

/// Server-side derivation of counter identifiers.
#[derive(Debug, Clone)]
pub struct KeyHasher {
    salt: Salt,
}

impl KeyHasher {
    pub fn new(salt: Salt) -> Self {
        Self { salt }
    }

    /// Namespace scoping every counter of one event of one application.
    pub fn namespace(&self, app_id: &str, event_name: &str) -> Namespace {
        Namespace::new(sha256_hex(&[self.salt.as_str(), app_id, ":", event_name]))
    }

    /// Key of one entity within an application.
    pub fn entity_key(&self, app_id: &str, entity: &str) -> EntityKey {
        EntityKey::new(sha256_hex(&[self.salt.as_str(), app_id, entity]))
    }
}

/// Client-side hashing for one call, remembering how to undo entity hashes.
///
/// Without an explicit salt, the salt is derived from the app id, so every
/// caller of one app agrees on entity hashes without sharing a secret.
#[derive(Debug)]
pub struct ClientHasher {
    app_id: String,
    salt: Salt,
    entities: HashMap<String, String>,
}

impl ClientHasher {
    pub fn new(app_id: &str, salt: Option<&str>) -> Self {
        let app_id_first = sha256_hex(&[app_id]);
        let salt = Salt::new(salt.map(str::to_string).unwrap_or_else(|| app_id_first.clone()));

        Self {
            app_id: sha256_hex(&[&app_id_first]),
            salt,
            entities: HashMap::new(),
        }
    }

    /// App id as sent on the wire.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn event_name(&self, event_name: &str) -> String {
        sha256_hex(&[self.salt.as_str(), event_name])
    }

    /// Hash an entity and remember the raw value behind the hash.
    pub fn entity(&mut self, entity: &str) -> String {
        let hash = sha256_hex(&[self.salt.as_str(), entity]);
        self.entities.insert(hash.clone(), entity.to_string());
        hash
    }

    /// Re-key a response map from entity hashes to raw entities.
    ///
    /// Hashes this hasher never produced are dropped.
    pub fn unhash<V>(&self, entities: HashMap<String, V>) -> HashMap<String, V> {
        entities
            .into_iter()
            .filter_map(|(hash, value)| self.entities.get(&hash).map(|raw| (raw.clone(), value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::distributions::Alphanumeric;
    use rand::Rng;
    use std::collections::HashSet;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(&["abc"]),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        // Parts hash as their concatenation
        assert_eq!(sha256_hex(&["a", "bc"]), sha256_hex(&["abc"]));
    }

    #[test]
    fn test_entity_key_deterministic() {
        let hasher = KeyHasher::new(Salt::new("pepper"));
        assert_eq!(hasher.entity_key("app", "user-1"), hasher.entity_key("app", "user-1"));
        assert_ne!(hasher.entity_key("app", "user-1"), hasher.entity_key("app", "user-2"));
    }

    #[test]
    fn test_salt_changes_keys() {
        let a = KeyHasher::new(Salt::new("one"));
        let b = KeyHasher::new(Salt::new("two"));
        assert_ne!(a.entity_key("app", "user"), b.entity_key("app", "user"));
        assert_ne!(a.namespace("app", "signup"), b.namespace("app", "signup"));
    }

    #[test]
    fn test_namespace_separates_app_and_event() {
        let hasher = KeyHasher::new(Salt::new("s"));
        assert_ne!(hasher.namespace("app", "signup"), hasher.namespace("app", "login"));
        assert_ne!(hasher.namespace("ab", "c"), hasher.namespace("a", "bc"));
    }

    #[test]
    fn test_no_collisions_over_random_inputs() {
        let hasher = KeyHasher::new(Salt::new("s"));
        let mut rng = rand::thread_rng();

        let raw: HashSet<String> = (0..10_000)
            .map(|_| {
                let len = rng.gen_range(1..24);
                (&mut rng).sample_iter(&Alphanumeric).take(len).map(char::from).collect()
            })
            .collect();
        let keys: HashSet<EntityKey> = raw.iter().map(|e| hasher.entity_key("app", e)).collect();

        assert_eq!(keys.len(), raw.len());
        assert!(keys.iter().all(|k| k.as_str().len() == 64));
    }

    #[test]
    fn test_salt_debug_is_redacted() {
        assert_eq!(format!("{:?}", Salt::new("secret")), "Salt(<redacted>)");
    }

    #[test]
    fn test_client_hasher_derives_salt_from_app_id() {
        let mut hasher = ClientHasher::new("my-app", None);
        let first = sha256_hex(&["my-app"]);

        assert_eq!(hasher.app_id(), sha256_hex(&[&first]));
        assert_eq!(hasher.event_name("signup"), sha256_hex(&[&first, "signup"]));
        assert_eq!(hasher.entity("1.2.3.4"), sha256_hex(&[&first, "1.2.3.4"]));
    }

    #[test]
    fn test_client_hasher_explicit_salt() {
        let mut hasher = ClientHasher::new("my-app", Some("s"));
        assert_eq!(hasher.entity("x"), sha256_hex(&["s", "x"]));
        assert_eq!(hasher.app_id(), sha256_hex(&[&sha256_hex(&["my-app"])]));
    }

    #[test]
    fn test_client_hasher_unhash() {
        let mut hasher = ClientHasher::new("app", None);
        let alice = hasher.entity("alice");
        let bob = hasher.entity("bob");

        let mut response = HashMap::new();
        response.insert(alice, 1);
        response.insert(bob, 2);
        response.insert("unknown".to_string(), 3);

        let unhashed = hasher.unhash(response);
        assert_eq!(unhashed.len(), 2);
        assert_eq!(unhashed["alice"], 1);
        assert_eq!(unhashed["bob"], 2);
    }
}
