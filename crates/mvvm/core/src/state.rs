//! Store state: plain data entries and live service references.
use std::any::Any;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::sync::Arc;

pub use serde_json::Value;

/// Returns the unqualified name of `T`, without module path or generics.
///
/// `my_app::services::Logger<Json>` becomes `Logger`. This is the name used to
/// match a live field value against the injection tokens of its class.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Shared, type-erased reference to a live object (a service, a router).
#[derive(Clone)]
pub struct ServiceRef {
    type_name: &'static str,
    handle: Arc<dyn Any + Send + Sync>,
}

impl ServiceRef {
    pub fn new<T: Any + Send + Sync>(service: Arc<T>) -> Self {
        Self {
            type_name: short_type_name::<T>(),
            handle: service,
        }
    }

    /// Short type name of the referenced value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Typed view of the reference, if it points at a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.handle).downcast::<T>().ok()
    }

    pub fn ptr_eq(&self, other: &ServiceRef) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }
}

impl fmt::Debug for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceRef({})", self.type_name)
    }
}

/// One state field.
///
/// `Live` references have not been classified yet; the serialization filter
/// turns the ones backed by injected dependencies into `Injected`. A `Live`
/// entry that reaches a payload boundary is a serialization hazard.
#[derive(Clone, Debug)]
pub enum StateEntry {
    Plain(Value),
    Injected(ServiceRef),
    Live(ServiceRef),
}

impl StateEntry {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            StateEntry::Plain(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceRef> {
        match self {
            StateEntry::Injected(service) | StateEntry::Live(service) => Some(service),
            StateEntry::Plain(_) => None,
        }
    }

    pub fn is_injected(&self) -> bool {
        matches!(self, StateEntry::Injected(_))
    }
}

impl From<Value> for StateEntry {
    fn from(value: Value) -> Self {
        StateEntry::Plain(value)
    }
}

/// Key-ordered collection of state entries.
#[derive(Clone, Debug, Default)]
pub struct State {
    entries: BTreeMap<String, StateEntry>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state whose entries are all plain data.
    pub fn from_plain(map: serde_json::Map<String, Value>) -> Self {
        Self {
            entries: map
                .into_iter()
                .map(|(key, value)| (key, StateEntry::Plain(value)))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&StateEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut StateEntry> {
        self.entries.get_mut(key)
    }

    /// Plain value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).and_then(StateEntry::as_value)
    }

    /// Typed live reference stored under `key`.
    pub fn service<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.entries
            .get(key)
            .and_then(StateEntry::as_service)
            .and_then(ServiceRef::downcast::<T>)
    }

    /// Writes a plain value, returning the previous entry.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<StateEntry> {
        self.entries
            .insert(key.into(), StateEntry::Plain(value.into()))
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: StateEntry) -> Option<StateEntry> {
        self.entries.insert(key.into(), entry)
    }

    /// Inserts `entry` only when `key` is absent. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, entry: StateEntry) -> bool {
        match self.entries.entry(key.into()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<StateEntry> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateEntry)> + '_ {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut StateEntry)> + '_ {
        self.entries
            .iter_mut()
            .map(|(key, entry)| (key.as_str(), entry))
    }

    // Typed accessors used by operations. Each reports the offending key.

    pub fn i64(&self, key: &str) -> Result<i64, crate::ActionError> {
        self.require(key)?
            .as_i64()
            .ok_or_else(|| crate::ActionError::TypeMismatch {
                key: key.to_string(),
                expected: "an integer",
            })
    }

    pub fn f64(&self, key: &str) -> Result<f64, crate::ActionError> {
        self.require(key)?
            .as_f64()
            .ok_or_else(|| crate::ActionError::TypeMismatch {
                key: key.to_string(),
                expected: "a number",
            })
    }

    pub fn bool(&self, key: &str) -> Result<bool, crate::ActionError> {
        self.require(key)?
            .as_bool()
            .ok_or_else(|| crate::ActionError::TypeMismatch {
                key: key.to_string(),
                expected: "a boolean",
            })
    }

    pub fn str(&self, key: &str) -> Result<&str, crate::ActionError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| crate::ActionError::TypeMismatch {
                key: key.to_string(),
                expected: "a string",
            })
    }

    fn require(&self, key: &str) -> Result<&Value, crate::ActionError> {
        match self.entries.get(key) {
            Some(StateEntry::Plain(value)) => Ok(value),
            Some(_) => Err(crate::ActionError::TypeMismatch {
                key: key.to_string(),
                expected: "plain data",
            }),
            None => Err(crate::ActionError::MissingField(key.to_string())),
        }
    }
}

impl FromIterator<(String, StateEntry)> for State {
    fn from_iter<I: IntoIterator<Item = (String, StateEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
