//! Store shapes: the initial state, derived values and operations a store is
//! created from.
use std::any::TypeId;
use std::sync::Arc;

use crate::lifecycle::LifecycleCaps;
use crate::schema::Schema;
use crate::state::State;
use crate::view_model::{Fields, ViewModel};

/// Everything needed to instantiate a store for one view-model class.
#[derive(Clone, Debug)]
pub struct StoreShape {
    class: &'static str,
    type_id: TypeId,
    initial_state: State,
    schema: Arc<Schema>,
}

impl StoreShape {
    pub fn class(&self) -> &'static str {
        self.class
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Whether this shape was built for view-model `V`.
    pub fn is<V: ViewModel>(&self) -> bool {
        self.type_id == TypeId::of::<V>()
    }

    pub fn initial_state(&self) -> &State {
        &self.initial_state
    }

    pub fn initial_state_mut(&mut self) -> &mut State {
        &mut self.initial_state
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn capabilities(&self) -> LifecycleCaps {
        self.schema.capabilities()
    }
}

/// Builds [`StoreShape`]s.
pub struct ShapeBuilder;

impl ShapeBuilder {
    /// Derives the shape of `V` from a resolved instance and hydrated state.
    ///
    /// Hydrated entries always win: an instance field only fills a key the
    /// hydration payload left absent, so values computed by a previous pass
    /// are never recomputed or overwritten.
    pub fn build<V: ViewModel>(schema: Arc<Schema>, fields: Fields, hydrated: State) -> StoreShape {
        let mut initial_state = hydrated;
        for (name, entry) in fields {
            initial_state.insert_if_absent(name, entry);
        }

        StoreShape {
            class: V::NAME,
            type_id: TypeId::of::<V>(),
            initial_state,
            schema,
        }
    }
}
