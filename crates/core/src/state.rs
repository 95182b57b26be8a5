//! Immutable state snapshots
//!
//! A [`State`] is a key/value snapshot of the system under test. Once built
//! it never changes: `with_property` and `with_properties` return a new
//! State and leave the receiver untouched.
//!
//! ## Sharing
//!
//! Properties live behind an `Arc`, so cloning a State is O(1) and the many
//! branch states alive during a pairwise test share storage until one of them
//! is derived from. Derivation copies the map once.
//!
//! ## Equality
//!
//! `PartialEq` and `Hash` look at the property map only. The creation
//! timestamp is informational.

use crate::error::{Error, Result};
use crate::timestamp::Timestamp;
use crate::value::{FromValue, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Immutable snapshot of named property values
///
/// Deserialization applies the same key validation as
/// [`with_property`](Self::with_property).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StateRepr")]
pub struct State {
    properties: Arc<BTreeMap<String, Value>>,
    created_at: Timestamp,
}

/// Wire shape of a [`State`] before its keys are checked
#[derive(Deserialize)]
struct StateRepr {
    properties: BTreeMap<String, Value>,
    #[serde(default)]
    created_at: Timestamp,
}

impl TryFrom<StateRepr> for State {
    type Error = Error;

    fn try_from(repr: StateRepr) -> Result<Self> {
        if let Some(bad) = repr.properties.keys().find(|k| k.trim().is_empty()) {
            return Err(Error::InvalidKey(bad.clone()));
        }
        Ok(State {
            properties: Arc::new(repr.properties),
            created_at: repr.created_at,
        })
    }
}

impl State {
    /// Create an empty state
    pub fn new() -> Self {
        State {
            properties: Arc::new(BTreeMap::new()),
            created_at: Timestamp::now(),
        }
    }

    /// Create a state holding `properties`
    ///
    /// Fails with `InvalidKey` if any key is empty. Later entries win on
    /// duplicate keys.
    pub fn from_properties<K, V, I>(properties: I) -> Result<Self>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        State::new().with_properties(properties)
    }

    /// Derive a new state with `key` set to `value`
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if `key` is empty or whitespace only.
    pub fn with_property(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        let key = validate_key(key.into())?;
        let mut properties = (*self.properties).clone();
        properties.insert(key, value.into());
        Ok(self.derive(properties))
    }

    /// Derive a new state with every entry of `updates` applied
    ///
    /// Entries are applied in iteration order, so a later duplicate key wins.
    /// The whole batch is rejected if any key is invalid.
    pub fn with_properties<K, V, I>(&self, updates: I) -> Result<Self>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut properties = (*self.properties).clone();
        for (key, value) in updates {
            properties.insert(validate_key(key.into())?, value.into());
        }
        Ok(self.derive(properties))
    }

    /// Typed lookup with a fallback
    ///
    /// Returns `default` when the key is absent or holds a different variant.
    /// A miss is not an error.
    pub fn get_property<T: FromValue>(&self, key: &str, default: T) -> T {
        self.properties
            .get(key)
            .and_then(T::from_value)
            .unwrap_or(default)
    }

    /// Raw lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Check if the state has a property
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// All properties in key order
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Property names in key order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the state holds no properties
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// When this state was created
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Property-wise [`Value::is_identical`]; creation time is ignored
    pub fn is_identical(&self, other: &State) -> bool {
        Arc::ptr_eq(&self.properties, &other.properties)
            || (self.properties.len() == other.properties.len()
                && self
                    .properties
                    .iter()
                    .zip(other.properties.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && va.is_identical(vb)))
    }

    fn derive(&self, properties: BTreeMap<String, Value>) -> Self {
        State {
            properties: Arc::new(properties),
            created_at: Timestamp::now(),
        }
    }
}

impl Default for State {
    fn default() -> Self {
        State::new()
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.properties, &other.properties) || self.properties == other.properties
    }
}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.properties.len().hash(state);
        for (k, v) in self.properties.iter() {
            k.hash(state);
            v.hash(state);
        }
    }
}

fn validate_key(key: String) -> Result<String> {
    if key.trim().is_empty() {
        return Err(Error::InvalidKey(key));
    }
    Ok(key)
}
