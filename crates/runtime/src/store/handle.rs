//! Reactive store handle.
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Map;
use tokio::sync::broadcast;

use mvvm_core::{
    ActionContext, LifecycleCaps, Outcome, SerializationFilter, State, StateEntry, StoreShape,
    Value, ViewModel,
};

use super::events::{ChangeKind, StoreChange};
use crate::api::StoreError;

type Result<T> = std::result::Result<T, StoreError>;

/// Cheap-clone handle to one live store.
///
/// All clones observe the same state. After [`Store::dispose`] the state
/// stays readable but writes, operations and new subscriptions are refused.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    id: &'static str,
    shape: Arc<StoreShape>,
    state: RwLock<State>,
    /// Entries layered over the shape's initial state for this store only.
    extras: State,
    changes: Mutex<Option<broadcast::Sender<StoreChange>>>,
    feed: broadcast::Sender<StoreChange>,
    disposed: AtomicBool,
}

impl Store {
    pub(crate) fn new(
        shape: Arc<StoreShape>,
        extras: State,
        feed: broadcast::Sender<StoreChange>,
        capacity: usize,
    ) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(StoreInner {
                id: shape.class(),
                state: RwLock::new(initial_state(&shape, &extras)),
                extras,
                shape,
                changes: Mutex::new(Some(changes)),
                feed,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &'static str {
        self.inner.id
    }

    /// Class name of the view-model this store was materialized from.
    pub fn class_name(&self) -> &'static str {
        self.inner.shape.class()
    }

    /// Whether this store was materialized from `V`.
    pub fn is<V: ViewModel>(&self) -> bool {
        self.inner.shape.is::<V>()
    }

    pub fn shape(&self) -> &Arc<StoreShape> {
        &self.inner.shape
    }

    pub fn capabilities(&self) -> LifecycleCaps {
        self.inner.shape.capabilities()
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.inner.shape.schema().has_operation(name)
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn ptr_eq(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn get(&self, key: &str) -> Result<Option<StateEntry>> {
        Ok(self.read()?.get(key).cloned())
    }

    pub fn value(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read()?.value(key).cloned())
    }

    pub fn service<T: Any + Send + Sync>(&self, key: &str) -> Result<Option<Arc<T>>> {
        Ok(self.read()?.service::<T>(key))
    }

    /// Copy of the whole state.
    pub fn state(&self) -> Result<State> {
        Ok(self.read()?.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.ensure_live()?;
        let key = key.into();
        self.write()?.set(key.clone(), value);
        self.publish(ChangeKind::Set { key });
        Ok(())
    }

    /// Writes several plain values in one change.
    pub fn patch(&self, values: Map<String, Value>) -> Result<()> {
        self.ensure_live()?;
        let keys: Vec<String> = values.keys().cloned().collect();
        {
            let mut state = self.write()?;
            for (key, value) in values {
                state.set(key, value);
            }
        }
        self.publish(ChangeKind::Patch { keys });
        Ok(())
    }

    /// Evaluates a derived value against the current state.
    pub fn derived(&self, name: &str) -> Result<Value> {
        let getter = self
            .inner
            .shape
            .schema()
            .derived(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownDerived {
                id: self.inner.id.to_string(),
                name: name.to_string(),
            })?;
        let state = self.read()?;
        Ok(getter(&*state))
    }

    /// Runs an operation against the state.
    ///
    /// The state is locked for the synchronous part only; a pending outcome is
    /// returned to the caller unawaited.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Outcome> {
        self.ensure_live()?;
        let schema = self.inner.shape.schema();
        let operation = schema
            .operation(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownOperation {
                id: self.inner.id.to_string(),
                name: name.to_string(),
            })?;

        let outcome = {
            let mut state = self.write()?;
            let mut ctx = ActionContext::new(&mut *state, schema);
            operation(&mut ctx, args)
        }
        .map_err(|source| StoreError::Action {
            id: self.inner.id.to_string(),
            name: name.to_string(),
            source,
        })?;

        tracing::trace!(
            target: "mvvm::store",
            store = self.inner.id,
            operation = name,
            pending = outcome.is_pending(),
            "operation ran"
        );
        self.publish(ChangeKind::Action {
            name: name.to_string(),
        });
        Ok(outcome)
    }

    /// Runs an operation and awaits its outcome.
    pub async fn call_async(&self, name: &str, args: &[Value]) -> Result<Value> {
        let outcome = self.call(name, args)?;
        outcome.resolve().await.map_err(|source| StoreError::Action {
            id: self.inner.id.to_string(),
            name: name.to_string(),
            source,
        })
    }

    /// Restores the initial state of the shape.
    pub fn reset(&self) -> Result<()> {
        self.ensure_live()?;
        *self.write()? = initial_state(&self.inner.shape, &self.inner.extras);
        self.publish(ChangeKind::Reset);
        Ok(())
    }

    /// Closes the change channel. Idempotent.
    pub fn dispose(&self) -> Result<()> {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let changes = self
            .inner
            .changes
            .lock()
            .map_err(|_| StoreError::LockPoisoned(self.inner.id.to_string()))?
            .take();
        let _ = self.inner.feed.send(StoreChange::new(self.inner.id, ChangeKind::Disposed));
        // Dropping the sender closes every subscriber.
        drop(changes);
        tracing::debug!(target: "mvvm::store", store = self.inner.id, "disposed");
        Ok(())
    }

    pub fn subscribe(&self) -> Result<broadcast::Receiver<StoreChange>> {
        let changes = self
            .inner
            .changes
            .lock()
            .map_err(|_| StoreError::LockPoisoned(self.inner.id.to_string()))?;
        changes
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or_else(|| StoreError::Disposed {
                id: self.inner.id.to_string(),
            })
    }

    /// Plain-data payload entry; injected entries are left out.
    pub fn snapshot(&self) -> Result<Map<String, Value>> {
        let state = self.read()?;
        Ok(SerializationFilter::snapshot(&state)?)
    }

    pub(crate) fn publish(&self, kind: ChangeKind) {
        let change = StoreChange::new(self.inner.id, kind);
        if let Ok(changes) = self.inner.changes.lock()
            && let Some(tx) = changes.as_ref()
        {
            // No subscribers is normal.
            let _ = tx.send(change.clone());
        }
        let _ = self.inner.feed.send(change);
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(StoreError::Disposed {
                id: self.inner.id.to_string(),
            });
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.inner
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned(self.inner.id.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.inner
            .state
            .write()
            .map_err(|_| StoreError::LockPoisoned(self.inner.id.to_string()))
    }
}

fn initial_state(shape: &StoreShape, extras: &State) -> State {
    let mut state = shape.initial_state().clone();
    for (key, entry) in extras.iter() {
        state.insert(key, entry.clone());
    }
    state
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvvm_core::{
        ActionError, Dependencies, Fields, ResolveError, Schema, SchemaBuilder, ShapeBuilder,
    };
    use serde_json::json;

    struct Counter;

    impl ViewModel for Counter {
        const NAME: &'static str = "Counter";

        fn construct(_deps: &mut Dependencies) -> std::result::Result<Self, ResolveError> {
            Ok(Self)
        }

        fn fields(self) -> Fields {
            Fields::new().data("count", 0)
        }

        fn schema(builder: &mut SchemaBuilder) {
            builder
                .getter("double", |state| json!(state.i64("count").unwrap_or(0) * 2))
                .action("increment", |ctx, _| {
                    let count = ctx.state().i64("count")?;
                    ctx.set("count", count + 1);
                    Ok(Value::Null)
                })
                .action("fail", |_, _| Err(ActionError::failed("boom")))
                .async_action("load", |_, _| async { Ok(json!(7)) });
        }
    }

    fn store() -> Store {
        let mut builder = Schema::builder();
        Counter::schema(&mut builder);
        let shape = ShapeBuilder::build::<Counter>(
            Arc::new(builder.build()),
            Counter.fields(),
            State::new(),
        );
        let (feed, _) = broadcast::channel(8);
        Store::new(Arc::new(shape), State::new(), feed, 8)
    }

    #[test]
    fn test_call_and_derived() {
        let store = store();

        store.call("increment", &[]).unwrap();
        store.call("increment", &[]).unwrap();
        assert_eq!(store.value("count").unwrap(), Some(json!(2)));
        assert_eq!(store.derived("double").unwrap(), json!(4));
        assert!(store.is::<Counter>());
        assert_eq!(store.class_name(), "Counter");
    }

    #[test]
    fn test_unknown_members() {
        let store = store();

        assert!(matches!(
            store.call("missing", &[]),
            Err(StoreError::UnknownOperation { .. })
        ));
        assert!(matches!(
            store.derived("missing"),
            Err(StoreError::UnknownDerived { .. })
        ));
    }

    #[test]
    fn test_action_error_keeps_source() {
        let store = store();

        let err = store.call("fail", &[]).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Action { ref name, source: ActionError::Failed(ref msg), .. }
                if name == "fail" && msg == "boom"
        ));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let store = store();
        store.set("count", 10).unwrap();

        store.reset().unwrap();
        assert_eq!(store.value("count").unwrap(), Some(json!(0)));
    }

    #[tokio::test]
    async fn test_subscribe_receives_changes() {
        let store = store();
        let mut rx = store.subscribe().unwrap();

        store.set("count", 3).unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Set { key: "count".into() });
    }

    #[tokio::test]
    async fn test_dispose_closes_subscribers() {
        let store = store();
        let mut rx = store.subscribe().unwrap();

        store.dispose().unwrap();
        store.dispose().unwrap();
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert!(matches!(store.subscribe(), Err(StoreError::Disposed { .. })));
        assert!(matches!(store.set("count", 1), Err(StoreError::Disposed { .. })));
        assert_eq!(store.value("count").unwrap(), Some(json!(0)));
    }

    #[tokio::test]
    async fn test_pending_outcome_is_returned() {
        let store = store();

        let outcome = store.call("load", &[]).unwrap();
        assert!(outcome.is_pending());
        assert_eq!(store.call_async("load", &[]).await.unwrap(), json!(7));
    }
}
