//! Binds a store's lifecycle hooks to a host event source.
use std::sync::Arc;

use mvvm_core::{ActionError, LifecycleCaps, LifecycleEvent, Outcome, Value};

use super::host::{HookCallback, LifecycleHost};
use crate::api::{MvvmError, Result, StoreError};
use crate::cache::ShapeCache;
use crate::store::{Store, StoreRegistry};

/// What the teardown event releases besides the store itself.
#[derive(Clone)]
pub struct Teardown {
    registry: Arc<StoreRegistry>,
    shapes: Option<Arc<ShapeCache>>,
}

impl Teardown {
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self {
            registry,
            shapes: None,
        }
    }

    /// Also evicts the store's shape from `shapes`.
    pub fn evicting(mut self, shapes: Arc<ShapeCache>) -> Self {
        self.shapes = Some(shapes);
        self
    }

    /// Disposes `store` and unregisters it if it is still the registered one.
    ///
    /// A newer store under the same id keeps both its registration and its
    /// class's cached shape.
    pub(crate) fn run(&self, store: &Store) -> std::result::Result<(), MvvmError> {
        if let Some(registered) = self.registry.get(store.id())?
            && registered.ptr_eq(store)
        {
            self.registry.remove(store.id())?;
            if let Some(shapes) = &self.shapes {
                shapes.evict(store.class_name())?;
            }
        }
        store.dispose()?;

        tracing::debug!(target: "mvvm::bridge", store = store.id(), "store torn down");
        Ok(())
    }
}

pub struct LifecycleBridge;

impl LifecycleBridge {
    /// Runs the setup hook synchronously, if the store declares one.
    pub fn setup(store: &Store) -> Result<Option<Outcome>> {
        if !store.capabilities().contains(LifecycleCaps::SETUP) {
            return Ok(None);
        }

        tracing::trace!(target: "mvvm::bridge", store = store.id(), "running setup hook");
        store
            .call(LifecycleEvent::Setup.hook_name(), &[])
            .map(Some)
            .map_err(|err| MvvmError::Hook {
                hook: LifecycleEvent::Setup.hook_name(),
                source: into_action_error(err),
            })
    }

    /// Invokes the hook for `event` if the store declares the capability.
    ///
    /// Undeclared hooks and disposed stores are silent no-ops.
    pub fn dispatch(
        store: &Store,
        event: LifecycleEvent,
        args: &[Value],
    ) -> std::result::Result<Outcome, ActionError> {
        if !store.capabilities().contains(event.capability()) || store.is_disposed() {
            return Ok(Outcome::done());
        }

        tracing::trace!(target: "mvvm::bridge", store = store.id(), %event, "dispatching hook");
        store
            .call(event.hook_name(), args)
            .map_err(into_action_error)
    }

    /// Subscribes `store` to every host event.
    ///
    /// The teardown event runs the store's hook, then removes the store from
    /// the registry and disposes it. Teardown happens even when the hook fails;
    /// the hook's error is still returned to the host.
    pub fn bind(store: &Store, host: &dyn LifecycleHost, teardown: Teardown) {
        for event in LifecycleEvent::HOST_EVENTS {
            let store = store.clone();
            let callback: HookCallback = if event.is_teardown() {
                let teardown = teardown.clone();
                Arc::new(move |args: &[Value]| {
                    let hook = Self::dispatch(&store, event, args);
                    teardown
                        .run(&store)
                        .map_err(|err| ActionError::failed(err.to_string()))?;
                    hook
                })
            } else {
                Arc::new(move |args: &[Value]| Self::dispatch(&store, event, args))
            };
            host.on(event, callback);
        }

        tracing::debug!(
            target: "mvvm::bridge",
            store = store.id(),
            capabilities = ?store.capabilities(),
            "bound lifecycle hooks"
        );
    }
}

/// Unwraps the hook's own error; other store failures become a message.
fn into_action_error(err: StoreError) -> ActionError {
    match err {
        StoreError::Action { source, .. } => source,
        other => ActionError::failed(other.to_string()),
    }
}
