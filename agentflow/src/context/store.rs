//! The shared key/value context and the deltas merged into it.

use super::keys;
use crate::errors::KeyOwnershipError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A set of writes returned by a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextDelta {
    writes: BTreeMap<String, serde_json::Value>,
}

impl ContextDelta {
    /// Creates an empty delta.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a write, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.writes.insert(key.into(), value);
        self
    }

    /// Adds a write.
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.writes.insert(key.into(), value);
    }

    /// Gets a written value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.writes.get(key)
    }

    /// Returns the written keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.writes.keys().map(String::as_str)
    }

    /// Returns the number of writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Returns true if nothing is written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Folds another delta into this one; later writes win.
    pub fn extend(&mut self, other: Self) {
        self.writes.extend(other.writes);
    }
}

impl FromIterator<(String, serde_json::Value)> for ContextDelta {
    fn from_iter<T: IntoIterator<Item = (String, serde_json::Value)>>(iter: T) -> Self {
        Self {
            writes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ContextDelta {
    type Item = (String, serde_json::Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, serde_json::Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

/// Shared key/value state threaded through one pipeline run.
///
/// Every key remembers the writer that owns it. A writer may overwrite its
/// own keys (last write wins) but never a key owned by someone else. Keys
/// iterate and serialize in sorted order, so two runs that wrote the same
/// values produce byte-identical output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    values: BTreeMap<String, serde_json::Value>,
    owners: BTreeMap<String, String>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context seeded with the inbound message text.
    #[must_use]
    pub fn from_input_text(text: impl Into<String>) -> Self {
        let mut ctx = Self::new();
        ctx.values
            .insert(keys::INPUT_TEXT.to_string(), serde_json::Value::String(text.into()));
        ctx.owners
            .insert(keys::INPUT_TEXT.to_string(), keys::INPUT_OWNER.to_string());
        ctx
    }

    /// Writes a seed value owned by the inbound message.
    ///
    /// # Errors
    ///
    /// Returns `KeyOwnershipError` if a stage already owns the key.
    pub fn seed(&mut self, key: impl Into<String>, value: serde_json::Value) -> Result<(), KeyOwnershipError> {
        self.write(keys::INPUT_OWNER, key, value)
    }

    /// Writes a single value on behalf of `writer`.
    ///
    /// # Errors
    ///
    /// Returns `KeyOwnershipError` if the key is owned by another writer.
    pub fn write(
        &mut self,
        writer: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), KeyOwnershipError> {
        let key = key.into();
        self.check_owner(writer, &key)?;
        self.owners.insert(key.clone(), writer.to_string());
        self.values.insert(key, value);
        Ok(())
    }

    /// Merges a delta on behalf of `writer`.
    ///
    /// Either every write is applied or none is. Returns the keys written.
    ///
    /// # Errors
    ///
    /// Returns `KeyOwnershipError` for the first key owned by another writer.
    pub fn merge(&mut self, writer: &str, delta: ContextDelta) -> Result<Vec<String>, KeyOwnershipError> {
        for key in delta.keys() {
            self.check_owner(writer, key)?;
        }

        let mut written = Vec::with_capacity(delta.len());
        for (key, value) in delta {
            self.owners.insert(key.clone(), writer.to_string());
            self.values.insert(key.clone(), value);
            written.push(key);
        }
        Ok(written)
    }

    fn check_owner(&self, writer: &str, key: &str) -> Result<(), KeyOwnershipError> {
        match self.owners.get(key) {
            Some(owner) if owner != writer => Err(KeyOwnershipError::new(key, owner, writer)),
            _ => Ok(()),
        }
    }

    /// Gets a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Gets a string value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(serde_json::Value::as_str)
    }

    /// Returns the owner of a key.
    #[must_use]
    pub fn owner_of(&self, key: &str) -> Option<&str> {
        self.owners.get(key).map(String::as_str)
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns all keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the context is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the writes present here but absent or different in `base`.
    #[must_use]
    pub fn changes_since(&self, base: &Self) -> ContextDelta {
        self.values
            .iter()
            .filter(|(key, value)| base.values.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Returns the values as a JSON object (sorted keys, owners omitted).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    /// SHA-256 of the canonical JSON form of the values, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let canonical = self.to_json().to_string();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }
}
