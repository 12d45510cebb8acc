//! Hydration payload and the coordinator that reads initial state from it.
//!
//! The payload carries, per view-model class name, a plain-data snapshot of
//! the state a previous (server) pass computed. The client pass starts its
//! stores from these snapshots instead of recomputing them.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::error::SerializeError;
use crate::state::{State, Value};

/// Class name to plain-data snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HydrationPayload {
    entries: BTreeMap<String, Map<String, Value>>,
}

impl HydrationPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, class: &str) -> Option<&Map<String, Value>> {
        self.entries.get(class)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.entries.contains_key(class)
    }

    /// Replaces the snapshot stored for `class`.
    pub fn insert(
        &mut self,
        class: impl Into<String>,
        snapshot: Map<String, Value>,
    ) -> Option<Map<String, Value>> {
        self.entries.insert(class.into(), snapshot)
    }

    pub fn remove(&mut self, class: &str) -> Option<Map<String, Value>> {
        self.entries.remove(class)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SerializeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a payload out of a generic key/value bag (the page response).
    ///
    /// Every entry must be a JSON object.
    pub fn from_value(value: Value) -> Result<Self, SerializeError> {
        let Value::Object(map) = value else {
            return Err(SerializeError::MalformedEntry {
                class: String::from("<root>"),
            });
        };

        let mut payload = Self::new();
        for (class, entry) in map {
            match entry {
                Value::Object(snapshot) => {
                    payload.insert(class, snapshot);
                }
                _ => return Err(SerializeError::MalformedEntry { class }),
            }
        }
        Ok(payload)
    }
}

/// Picks the initial state of a class from a hydration payload.
pub struct HydrationCoordinator;

impl HydrationCoordinator {
    /// `payload[class]` verbatim, or an empty state when absent.
    ///
    /// No merging happens here; instance defaults are layered on by the shape
    /// builder so precedence lives in one place.
    pub fn initial_state(class: &str, payload: &HydrationPayload) -> State {
        payload
            .get(class)
            .cloned()
            .map(State::from_plain)
            .unwrap_or_default()
    }
}
