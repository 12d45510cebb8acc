//! Process-wide (per context) registry of live stores.
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde_json::Map;
use tokio::sync::broadcast;

use mvvm_core::{State, StoreShape, Value};

use super::events::{ChangeKind, StoreChange};
use super::handle::Store;
use crate::api::StoreError;

type Result<T> = std::result::Result<T, StoreError>;

/// Live stores keyed by id, plus a change feed mirroring every store.
pub struct StoreRegistry {
    stores: RwLock<HashMap<&'static str, Store>>,
    feed: broadcast::Sender<StoreChange>,
    capacity: usize,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Registry whose feed and per-store channels hold `capacity` changes.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (feed, _) = broadcast::channel(capacity);
        Self {
            stores: RwLock::new(HashMap::new()),
            feed,
            capacity,
        }
    }

    /// Returns the live store registered under `id`, creating it from `shape`
    /// when absent.
    ///
    /// A new store starts from a copy of the shape's initial state. An existing
    /// store is returned as is, so at most one store exists per id.
    pub fn use_store(&self, id: &'static str, shape: &Arc<StoreShape>) -> Result<Store> {
        self.use_store_with(id, shape, State::new())
    }

    /// Like [`StoreRegistry::use_store`]; a newly created store also starts
    /// with `extras`, which survive [`Store::reset`].
    pub fn use_store_with(
        &self,
        id: &'static str,
        shape: &Arc<StoreShape>,
        extras: State,
    ) -> Result<Store> {
        self.acquire(id, shape, extras).map(|(store, _)| store)
    }

    /// Returns the store for `id` and whether this call created it.
    pub(crate) fn acquire(
        &self,
        id: &'static str,
        shape: &Arc<StoreShape>,
        extras: State,
    ) -> Result<(Store, bool)> {
        if let Some(store) = self.get(id)? {
            return Ok((store, false));
        }

        let mut stores = self
            .stores
            .write()
            .map_err(|_| StoreError::RegistryLockPoisoned)?;
        if let Some(store) = stores.get(id) {
            return Ok((store.clone(), false));
        }

        let store = Store::new(shape.clone(), extras, self.feed.clone(), self.capacity);
        stores.insert(id, store.clone());
        drop(stores);

        tracing::debug!(target: "mvvm::store", store = id, "created store");
        store.publish(ChangeKind::Created);
        Ok((store, true))
    }

    pub fn get(&self, id: &str) -> Result<Option<Store>> {
        let stores = self
            .stores
            .read()
            .map_err(|_| StoreError::RegistryLockPoisoned)?;
        Ok(stores.get(id).cloned())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.stores
            .read()
            .map(|stores| stores.contains_key(id))
            .unwrap_or(false)
    }

    /// Drops the store registered under `id`. Removing an absent id is a no-op.
    pub fn remove(&self, id: &str) -> Result<Option<Store>> {
        let removed = self
            .stores
            .write()
            .map_err(|_| StoreError::RegistryLockPoisoned)?
            .remove(id);

        if let Some(store) = &removed {
            tracing::debug!(target: "mvvm::store", store = store.id(), "removed store");
            let _ = self
                .feed
                .send(StoreChange::new(store.id(), ChangeKind::Removed));
        }
        Ok(removed)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Result<Vec<&'static str>> {
        let stores = self
            .stores
            .read()
            .map_err(|_| StoreError::RegistryLockPoisoned)?;
        let mut ids: Vec<&'static str> = stores.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    pub fn len(&self) -> usize {
        self.stores.read().map(|stores| stores.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Plain-data snapshot of every live store, keyed by id.
    ///
    /// A store that cannot be snapshotted (an unflagged live reference in its
    /// state) is logged and left out; the other stores are still returned.
    pub fn snapshots(&self) -> Result<BTreeMap<String, Map<String, Value>>> {
        let stores: Vec<Store> = self
            .stores
            .read()
            .map_err(|_| StoreError::RegistryLockPoisoned)?
            .values()
            .cloned()
            .collect();

        let mut snapshots = BTreeMap::new();
        for store in &stores {
            match store.snapshot() {
                Ok(snapshot) => {
                    snapshots.insert(store.id().to_string(), snapshot);
                }
                Err(err) => tracing::error!(
                    target: "mvvm::store",
                    store = store.id(),
                    error = %err,
                    "skipping store that cannot be snapshotted"
                ),
            }
        }
        Ok(snapshots)
    }

    /// Receives every change of every store in this registry.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.feed.subscribe()
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("ids", &self.ids().unwrap_or_default())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvvm_core::{Dependencies, Fields, ResolveError, Schema, SchemaBuilder, ShapeBuilder, ViewModel};
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

        fn schema(_builder: &mut SchemaBuilder) {}
    }

    fn shape() -> Arc<StoreShape> {
        Arc::new(ShapeBuilder::build::<Counter>(
            Arc::new(Schema::default()),
            Counter.fields(),
            State::new(),
        ))
    }

    #[test]
    fn test_use_store_returns_existing_instance() {
        let registry = StoreRegistry::new();
        let shape = shape();

        let first = registry.use_store("Counter", &shape).unwrap();
        first.set("count", 4).unwrap();
        let second = registry.use_store("Counter", &shape).unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(second.value("count").unwrap(), Some(json!(4)));
        assert_eq!(registry.ids().unwrap(), vec!["Counter"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = StoreRegistry::new();
        registry.use_store("Counter", &shape()).unwrap();

        assert!(registry.remove("Counter").unwrap().is_some());
        assert!(registry.remove("Counter").unwrap().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_new_store_after_remove_starts_fresh() {
        let registry = StoreRegistry::new();
        let shape = shape();
        registry.use_store("Counter", &shape).unwrap().set("count", 9).unwrap();
        registry.remove("Counter").unwrap();

        let store = registry.use_store("Counter", &shape).unwrap();
        assert_eq!(store.value("count").unwrap(), Some(json!(0)));
    }

    #[tokio::test]
    async fn test_feed_mirrors_store_changes() {
        let registry = StoreRegistry::new();
        let mut feed = registry.subscribe();

        let store = registry.use_store("Counter", &shape()).unwrap();
        store.set("count", 1).unwrap();
        registry.remove("Counter").unwrap();

        let kinds: Vec<ChangeKind> = vec![
            feed.recv().await.unwrap().kind,
            feed.recv().await.unwrap().kind,
            feed.recv().await.unwrap().kind,
        ];
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Created,
                ChangeKind::Set { key: "count".into() },
                ChangeKind::Removed,
            ]
        );
    }

    #[test]
    fn test_snapshots() {
        let registry = StoreRegistry::new();
        registry.use_store("Counter", &shape()).unwrap();

        let snapshots = registry.snapshots().unwrap();
        assert_eq!(snapshots["Counter"].get("count"), Some(&json!(0)));
    }

    struct Clock;

    struct Ticker;

    impl ViewModel for Ticker {
        const NAME: &'static str = "Ticker";

        fn construct(_deps: &mut Dependencies) -> std::result::Result<Self, ResolveError> {
            Ok(Self)
        }

        fn fields(self) -> Fields {
            Fields::new().object("clock", Arc::new(Clock)).data("ticks", 0)
        }

        fn schema(_builder: &mut SchemaBuilder) {}
    }

    #[test]
    fn test_snapshots_skip_store_with_live_entry() {
        let registry = StoreRegistry::new();
        registry.use_store("Counter", &shape()).unwrap().set("count", 1).unwrap();
        let ticker = Arc::new(ShapeBuilder::build::<Ticker>(
            Arc::new(Schema::default()),
            Ticker.fields(),
            State::new(),
        ));
        registry.use_store("Ticker", &ticker).unwrap();

        let snapshots = registry.snapshots().unwrap();
        assert!(!snapshots.contains_key("Ticker"));
        assert_eq!(snapshots["Counter"].get("count"), Some(&json!(1)));
    }
}
