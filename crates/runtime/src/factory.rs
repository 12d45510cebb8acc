//! View-model factory: turns a view-model type into a live store.
//!
//! # Materialization
//!
//! 1. The container resolves the view-model (dependencies included).
//! 2. A root materialization derives the class's [`StoreShape`] when the
//!    context has none cached: the hydration payload entry for the class is
//!    layered under the instance fields, injected services are flagged, and the
//!    shape is cached for the rest of the context's lifetime.
//! 3. A child materialization reuses the cached shape and fails with
//!    [`MvvmError::UninitializedRoot`] when the root has not run yet.
//! 4. The store registry returns the live store for the class or creates one.
//! 5. A root materialization then runs the setup hook and binds the store to
//!    the host's lifecycle events. When setup fails on a store this call
//!    created, the store is unregistered and disposed before the error returns.
use std::any::TypeId;
use std::sync::Arc;

use bitflags::bitflags;

use mvvm_core::filter::{ROUTE_FIELD, ROUTER_FIELD};
use mvvm_core::{
    ActionError, HydrationCoordinator, LifecycleEvent, Outcome, SerializationFilter, ShapeBuilder,
    State, StateEntry, StoreShape, ViewModel,
};

use crate::api::{MvvmError, Result};
use crate::container::ResolvedViewModel;
use crate::context::MvvmContext;
use crate::hooks::{LifecycleBridge, LifecycleHost, Teardown};
use crate::store::Store;

bitflags! {
    /// Relationship of a materialization to its class's root.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct VmFlags: u8 {
        /// Reuse the root's shape and store; bind no lifecycle events.
        const CHILD = 1 << 0;
    }
}

pub struct ViewModelFactory<'a> {
    ctx: &'a MvvmContext,
}

impl<'a> ViewModelFactory<'a> {
    pub fn new(ctx: &'a MvvmContext) -> Self {
        Self { ctx }
    }

    pub fn materialize<V: ViewModel>(&self, flags: VmFlags, host: &dyn LifecycleHost) -> Result<Store> {
        let resolved = self.ctx.container().resolve_view_model::<V>()?;
        let is_child = flags.contains(VmFlags::CHILD);

        let cached = self.ctx.shapes().get_typed(V::NAME, TypeId::of::<V>())?;
        let shape = match cached {
            Some(shape) => shape,
            None if !is_child || self.ctx.config().lazy_child_shapes => {
                self.build_shape::<V>(resolved)?
            }
            None => {
                tracing::warn!(
                    target: "mvvm::factory",
                    class = V::NAME,
                    "child materialized before its root"
                );
                return Err(MvvmError::UninitializedRoot { class: V::NAME });
            }
        };

        let (store, created) =
            self.ctx
                .stores()
                .acquire(V::NAME, &shape, navigation_entries(host))?;

        if !is_child {
            if let Err(err) = Self::run_setup(&store) {
                if created {
                    self.discard(&store);
                }
                return Err(err);
            }

            let mut teardown = Teardown::new(self.ctx.stores().clone());
            if self.ctx.config().evict_on_dispose {
                teardown = teardown.evicting(self.ctx.shapes().clone());
            }
            LifecycleBridge::bind(&store, host, teardown);
        }

        tracing::debug!(
            target: "mvvm::factory",
            class = V::NAME,
            child = is_child,
            "materialized view-model"
        );
        Ok(store)
    }

    fn run_setup(store: &Store) -> Result<()> {
        match LifecycleBridge::setup(store)? {
            Some(Outcome::Pending(_)) => Err(MvvmError::Hook {
                hook: LifecycleEvent::Setup.hook_name(),
                source: ActionError::failed("setup must complete synchronously"),
            }),
            _ => Ok(()),
        }
    }

    /// Unregisters and disposes a store whose setup failed.
    fn discard(&self, store: &Store) {
        if let Err(err) = Teardown::new(self.ctx.stores().clone()).run(store) {
            tracing::error!(
                target: "mvvm::factory",
                store = store.id(),
                error = %err,
                "failed to discard store after setup failure"
            );
            return;
        }
        tracing::warn!(
            target: "mvvm::factory",
            store = store.id(),
            "discarded store after setup failure"
        );
    }

    fn build_shape<V: ViewModel>(&self, resolved: ResolvedViewModel) -> Result<Arc<StoreShape>> {
        let hydrated = {
            let payload = self
                .ctx
                .payload_handle()
                .read()
                .map_err(|_| MvvmError::PayloadLockPoisoned)?;
            HydrationCoordinator::initial_state(V::NAME, &payload)
        };
        let hydrated_keys = hydrated.len();

        let mut shape = ShapeBuilder::build::<V>(resolved.schema, resolved.fields, hydrated);
        let injected = self.ctx.container().injected_names(V::NAME)?;
        let flagged = SerializationFilter::apply(shape.initial_state_mut(), &injected);

        tracing::debug!(
            target: "mvvm::factory",
            class = V::NAME,
            fields = shape.initial_state().len(),
            hydrated = hydrated_keys,
            ?flagged,
            "built store shape"
        );
        self.ctx.shapes().insert(shape)
    }
}

/// Route and router entries for a store created under `host`.
fn navigation_entries(host: &dyn LifecycleHost) -> State {
    let mut entries = State::new();
    if let Some(navigation) = host.navigation() {
        entries.insert(ROUTE_FIELD, StateEntry::Injected(navigation.route));
        entries.insert(ROUTER_FIELD, StateEntry::Injected(navigation.router));
    }
    entries
}
