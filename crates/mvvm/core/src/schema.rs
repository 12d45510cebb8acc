//! Declared view-model schemas: derived values, operations and lifecycle hooks.
//!
//! A schema is the compile-time replacement for reflecting over a class
//! prototype. Each view-model describes its members once through a
//! [`SchemaBuilder`]; the resulting [`Schema`] is shared by every store shape
//! built for that view-model.
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ActionError;
use crate::lifecycle::{LifecycleCaps, LifecycleEvent};
use crate::state::{ServiceRef, State, StateEntry, Value};

/// Asynchronous result of an operation. Never awaited by the core.
pub type PendingAction = Pin<Box<dyn Future<Output = Result<Value, ActionError>> + Send + 'static>>;

/// Derived value computed from the current state.
pub type DerivedFn = Arc<dyn Fn(&State) -> Value + Send + Sync>;

/// Mutating operation with access to the store state and its other members.
pub type ActionFn =
    Arc<dyn Fn(&mut ActionContext<'_>, &[Value]) -> Result<Outcome, ActionError> + Send + Sync>;

/// What an operation produced.
pub enum Outcome {
    Ready(Value),
    /// Asynchronous work the caller is responsible for awaiting.
    Pending(PendingAction),
}

impl Outcome {
    /// Completed with no value.
    pub fn done() -> Self {
        Outcome::Ready(Value::Null)
    }

    pub fn ready(value: impl Into<Value>) -> Self {
        Outcome::Ready(value.into())
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, ActionError>> + Send + 'static,
    {
        Outcome::Pending(Box::pin(future))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending(_))
    }

    /// Ready value, or `None` if the outcome is still pending.
    pub fn into_ready(self) -> Option<Value> {
        match self {
            Outcome::Ready(value) => Some(value),
            Outcome::Pending(_) => None,
        }
    }

    /// Awaits a pending outcome; ready outcomes resolve immediately.
    pub async fn resolve(self) -> Result<Value, ActionError> {
        match self {
            Outcome::Ready(value) => Ok(value),
            Outcome::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Outcome::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// View of a store handed to operations while they run.
pub struct ActionContext<'a> {
    state: &'a mut State,
    schema: &'a Schema,
}

impl<'a> ActionContext<'a> {
    pub fn new(state: &'a mut State, schema: &'a Schema) -> Self {
        Self { state, schema }
    }

    pub fn state(&self) -> &State {
        &*self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut *self.state
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.state.value(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<StateEntry> {
        self.state.set(key, value)
    }

    pub fn service<T: std::any::Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.state.service::<T>(key)
    }

    /// Live reference stored under `key`, failing with the key name if absent.
    pub fn require_service<T: std::any::Any + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Arc<T>, ActionError> {
        self.service::<T>(key)
            .ok_or_else(|| ActionError::MissingField(key.to_string()))
    }

    pub fn service_ref(&self, key: &str) -> Option<&ServiceRef> {
        self.state.get(key).and_then(StateEntry::as_service)
    }

    /// Evaluates a derived value against the current state.
    pub fn derived(&self, name: &str) -> Option<Value> {
        self.schema.derived(name).map(|getter| getter(&*self.state))
    }

    /// Invokes another operation of the same store.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Outcome, ActionError> {
        let operation = self
            .schema
            .operation(name)
            .cloned()
            .ok_or_else(|| ActionError::UnknownOperation(name.to_string()))?;
        operation(self, args)
    }
}

/// Derived values, operations and lifecycle capabilities of one view-model.
#[derive(Clone, Default)]
pub struct Schema {
    derived: BTreeMap<String, DerivedFn>,
    operations: BTreeMap<String, ActionFn>,
    capabilities: LifecycleCaps,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn derived(&self, name: &str) -> Option<&DerivedFn> {
        self.derived.get(name)
    }

    pub fn operation(&self, name: &str) -> Option<&ActionFn> {
        self.operations.get(name)
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn capabilities(&self) -> LifecycleCaps {
        self.capabilities
    }

    pub fn derived_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.derived.keys().map(String::as_str)
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.operations.keys().map(String::as_str)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("derived", &self.derived.keys().collect::<Vec<_>>())
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Collects the members of a view-model into a [`Schema`].
///
/// Base view-models are composed by calling the base type's `schema` function
/// first; later registrations under the same name override earlier ones.
#[derive(Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a read-only derived value.
    pub fn getter<F>(&mut self, name: impl Into<String>, getter: F) -> &mut Self
    where
        F: Fn(&State) -> Value + Send + Sync + 'static,
    {
        self.schema.derived.insert(name.into(), Arc::new(getter));
        self
    }

    /// Registers a synchronous operation.
    pub fn action<F>(&mut self, name: impl Into<String>, action: F) -> &mut Self
    where
        F: Fn(&mut ActionContext<'_>, &[Value]) -> Result<Value, ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.operation(name, move |ctx, args| action(ctx, args).map(Outcome::Ready))
    }

    /// Registers an operation that returns a future.
    ///
    /// The closure runs synchronously against the state; the future it returns
    /// must own everything it needs.
    pub fn async_action<F, Fut>(&mut self, name: impl Into<String>, action: F) -> &mut Self
    where
        F: Fn(&mut ActionContext<'_>, &[Value]) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ActionError>> + Send + 'static,
    {
        self.operation(name, move |ctx, args| Ok(Outcome::pending(action(ctx, args))))
    }

    /// Registers an operation that decides per call whether it completes now.
    pub fn operation<F>(&mut self, name: impl Into<String>, operation: F) -> &mut Self
    where
        F: Fn(&mut ActionContext<'_>, &[Value]) -> Result<Outcome, ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.schema.operations.insert(name.into(), Arc::new(operation));
        self
    }

    pub(crate) fn hook<F>(&mut self, event: LifecycleEvent, hook: F) -> &mut Self
    where
        F: Fn(&mut ActionContext<'_>, &[Value]) -> Result<Outcome, ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.schema.capabilities |= event.capability();
        self.operation(event.hook_name(), hook)
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}
