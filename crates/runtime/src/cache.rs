//! Per-context cache of derived store shapes.
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use mvvm_core::StoreShape;

use crate::api::{MvvmError, Result};

/// Class name to shape, scoped to one [`MvvmContext`](crate::MvvmContext).
///
/// A name is bound to one view-model type for as long as its shape is cached;
/// inserting a shape of another type under the same name is rejected.
#[derive(Debug, Default)]
pub struct ShapeCache {
    shapes: RwLock<HashMap<&'static str, Arc<StoreShape>>>,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, class: &str) -> Result<Option<Arc<StoreShape>>> {
        let shapes = self
            .shapes
            .read()
            .map_err(|_| MvvmError::CacheLockPoisoned)?;
        Ok(shapes.get(class).cloned())
    }

    /// Shape cached for `class` if it belongs to type `type_id`.
    pub fn get_typed(&self, class: &'static str, type_id: TypeId) -> Result<Option<Arc<StoreShape>>> {
        match self.get(class)? {
            Some(shape) if shape.type_id() != type_id => Err(MvvmError::ClassNameCollision { name: class }),
            other => Ok(other),
        }
    }

    /// Caches `shape` unless one is already present, returning the cached one.
    ///
    /// The first insertion wins so every store of a class shares one shape.
    pub fn insert(&self, shape: StoreShape) -> Result<Arc<StoreShape>> {
        let mut shapes = self
            .shapes
            .write()
            .map_err(|_| MvvmError::CacheLockPoisoned)?;

        let class = shape.class();
        if let Some(existing) = shapes.get(class) {
            if existing.type_id() != shape.type_id() {
                return Err(MvvmError::ClassNameCollision { name: class });
            }
            return Ok(existing.clone());
        }

        let shape = Arc::new(shape);
        shapes.insert(class, shape.clone());
        tracing::debug!(target: "mvvm::factory", class, "cached store shape");
        Ok(shape)
    }

    pub fn evict(&self, class: &str) -> Result<Option<Arc<StoreShape>>> {
        let mut shapes = self
            .shapes
            .write()
            .map_err(|_| MvvmError::CacheLockPoisoned)?;
        let evicted = shapes.remove(class);
        if evicted.is_some() {
            tracing::debug!(target: "mvvm::factory", class, "evicted store shape");
        }
        Ok(evicted)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.shapes
            .read()
            .map(|shapes| shapes.contains_key(class))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.shapes.read().map(|shapes| shapes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> Result<()> {
        self.shapes
            .write()
            .map_err(|_| MvvmError::CacheLockPoisoned)?
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvvm_core::{
        Dependencies, Fields, ResolveError, Schema, SchemaBuilder, ShapeBuilder, State, ViewModel,
    };

    struct Counter;
    struct OtherCounter;

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

    impl ViewModel for OtherCounter {
        const NAME: &'static str = "Counter";

        fn construct(_deps: &mut Dependencies) -> std::result::Result<Self, ResolveError> {
            Ok(Self)
        }

        fn fields(self) -> Fields {
            Fields::new()
        }

        fn schema(_builder: &mut SchemaBuilder) {}
    }

    fn shape<V: ViewModel>() -> StoreShape {
        let fields = V::construct(&mut Dependencies::new(V::NAME, Vec::new()))
            .unwrap()
            .fields();
        ShapeBuilder::build::<V>(Arc::new(Schema::default()), fields, State::new())
    }

    #[test]
    fn test_first_insert_wins() {
        let cache = ShapeCache::new();

        let first = cache.insert(shape::<Counter>()).unwrap();
        let second = cache.insert(shape::<Counter>()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_name_collision_rejected() {
        let cache = ShapeCache::new();
        cache.insert(shape::<Counter>()).unwrap();

        let err = cache.insert(shape::<OtherCounter>()).unwrap_err();
        assert!(matches!(err, MvvmError::ClassNameCollision { name: "Counter" }));
        assert!(cache
            .get_typed("Counter", TypeId::of::<OtherCounter>())
            .is_err());
    }

    #[test]
    fn test_evict() {
        let cache = ShapeCache::new();
        cache.insert(shape::<Counter>()).unwrap();

        assert!(cache.evict("Counter").unwrap().is_some());
        assert!(cache.evict("Counter").unwrap().is_none());
        assert!(cache.is_empty());
    }
}
