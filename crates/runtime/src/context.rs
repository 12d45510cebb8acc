//! Per-request materialization context.
use std::sync::{Arc, RwLock};

use mvvm_core::{HydrationPayload, ViewModel};

use crate::api::{MvvmError, Result};
use crate::cache::ShapeCache;
use crate::config::MvvmConfig;
use crate::container::Container;
use crate::factory::{ViewModelFactory, VmFlags};
use crate::hooks::{LifecycleHost, NoopHost};
use crate::payload::{PayloadWriter, capture};
use crate::store::{Store, StoreRegistry};

/// Scope of one server pass (one request) or one client pass (one page).
///
/// Owns the shape cache, the store registry and the hydration payload; the
/// container is shared between contexts. Build one per logical request so no
/// two requests alias the same shape or store.
pub struct MvvmContext {
    config: MvvmConfig,
    container: Arc<Container>,
    shapes: Arc<ShapeCache>,
    stores: Arc<StoreRegistry>,
    payload: Arc<RwLock<HydrationPayload>>,
}

impl MvvmContext {
    pub fn builder() -> MvvmContextBuilder {
        MvvmContextBuilder::new()
    }

    /// Context with default configuration and an empty payload.
    pub fn new(container: Arc<Container>) -> Self {
        Self::builder().container(container).build()
    }

    /// Materializes `V` as a root view-model bound to `host`.
    pub fn use_vm<V: ViewModel>(&self, host: &dyn LifecycleHost) -> Result<Store> {
        self.factory().materialize::<V>(VmFlags::empty(), host)
    }

    /// Materializes `V` as a child of an already materialized root.
    pub fn use_child_vm<V: ViewModel>(&self) -> Result<Store> {
        self.factory().materialize::<V>(VmFlags::CHILD, &NoopHost)
    }

    pub fn factory(&self) -> ViewModelFactory<'_> {
        ViewModelFactory::new(self)
    }

    pub fn config(&self) -> &MvvmConfig {
        &self.config
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn shapes(&self) -> &Arc<ShapeCache> {
        &self.shapes
    }

    pub fn stores(&self) -> &Arc<StoreRegistry> {
        &self.stores
    }

    pub fn payload_handle(&self) -> &Arc<RwLock<HydrationPayload>> {
        &self.payload
    }

    /// Copy of the current hydration payload.
    pub fn payload(&self) -> Result<HydrationPayload> {
        let payload = self
            .payload
            .read()
            .map_err(|_| MvvmError::PayloadLockPoisoned)?;
        Ok(payload.clone())
    }

    /// Rebuilds the payload from the live stores and returns it.
    pub fn capture_payload(&self) -> Result<HydrationPayload> {
        let captured = capture(&self.stores)?;
        *self
            .payload
            .write()
            .map_err(|_| MvvmError::PayloadLockPoisoned)? = captured.clone();
        Ok(captured)
    }

    /// Keeps the payload in sync with the stores on the server pass.
    ///
    /// Returns `None` on the client pass, where the payload is only read.
    pub fn spawn_payload_writer(&self) -> Option<PayloadWriter> {
        if !self.config.is_server() {
            return None;
        }
        Some(PayloadWriter::spawn(self.stores.clone(), self.payload.clone()))
    }
}

impl std::fmt::Debug for MvvmContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MvvmContext")
            .field("config", &self.config)
            .field("shapes", &self.shapes.len())
            .field("stores", &self.stores)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct MvvmContextBuilder {
    config: Option<MvvmConfig>,
    container: Option<Arc<Container>>,
    payload: Option<HydrationPayload>,
}

impl MvvmContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: MvvmConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn container(mut self, container: Arc<Container>) -> Self {
        self.container = Some(container);
        self
    }

    /// Payload a previous pass produced; the client pass hydrates from it.
    pub fn payload(mut self, payload: HydrationPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn build(self) -> MvvmContext {
        let config = self.config.unwrap_or_default();
        let stores = StoreRegistry::with_capacity(config.change_buffer_size);
        tracing::debug!(
            target: "mvvm::factory",
            pass = %config.pass,
            hydrated_classes = self.payload.as_ref().map_or(0, HydrationPayload::len),
            "created context"
        );

        MvvmContext {
            container: self.container.unwrap_or_default(),
            shapes: Arc::new(ShapeCache::new()),
            stores: Arc::new(stores),
            payload: Arc::new(RwLock::new(self.payload.unwrap_or_default())),
            config,
        }
    }
}
