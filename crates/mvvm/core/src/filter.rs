//! Serialization filter: keeps live references out of hydration payloads.
//!
//! State entries backed by injected dependencies are tagged
//! [`StateEntry::Injected`] before any payload is written. Payload writers skip
//! injected entries and refuse to serialize references that were never
//! classified.
use std::collections::BTreeSet;

use serde_json::Map;

use crate::error::SerializeError;
use crate::state::{State, StateEntry, Value};

/// Key of the navigation route pseudo-field.
pub const ROUTE_FIELD: &str = "route";
/// Key of the navigation router pseudo-field.
pub const ROUTER_FIELD: &str = "router";

pub struct SerializationFilter;

impl SerializationFilter {
    /// Flags the entry at `key` as excluded from serialization.
    ///
    /// Returns `true` if the entry is now excluded. Plain data cannot be
    /// excluded and absent keys are ignored; both return `false`.
    pub fn mark_non_serializable(state: &mut State, key: &str) -> bool {
        let Some(entry) = state.get_mut(key) else {
            return false;
        };

        match entry {
            StateEntry::Injected(_) => true,
            StateEntry::Live(service) => {
                let service = service.clone();
                *entry = StateEntry::Injected(service);
                true
            }
            StateEntry::Plain(_) => false,
        }
    }

    pub fn should_exclude(entry: &StateEntry) -> bool {
        entry.is_injected()
    }

    /// Tags every live entry whose type name is one of `injected_names`.
    ///
    /// Returns the keys that were flagged by this pass.
    pub fn apply(state: &mut State, injected_names: &BTreeSet<String>) -> Vec<String> {
        let matching: Vec<String> = state
            .iter()
            .filter_map(|(key, entry)| match entry {
                StateEntry::Live(service) if injected_names.contains(service.type_name()) => {
                    Some(key.to_string())
                }
                _ => None,
            })
            .collect();

        for key in &matching {
            Self::mark_non_serializable(state, key);
        }
        matching
    }

    /// Plain-data snapshot of `state` for a hydration payload.
    ///
    /// Injected entries are skipped; an unclassified live reference fails.
    pub fn snapshot(state: &State) -> Result<Map<String, Value>, SerializeError> {
        let mut snapshot = Map::new();
        for (key, entry) in state.iter() {
            match entry {
                StateEntry::Plain(value) => {
                    snapshot.insert(key.to_string(), value.clone());
                }
                StateEntry::Injected(_) => {}
                StateEntry::Live(service) => {
                    return Err(SerializeError::LiveReference {
                        key: key.to_string(),
                        type_name: service.type_name(),
                    });
                }
            }
        }
        Ok(snapshot)
    }
}
