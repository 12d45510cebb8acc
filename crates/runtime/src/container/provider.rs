//! Provider kinds, lifetimes and transforms used by the container.
use std::any::TypeId;
use std::sync::Arc;

use mvvm_core::{Fields, ResolveError, Schema, ServiceRef, Value};

use super::Container;

/// How long a factory-built service lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// Built on every resolution.
    #[default]
    Transient,
    /// Built on first resolution and reused for the container's lifetime.
    Singleton,
}

/// How a view-model instance is shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum VmScope {
    /// One instance per container: the fields of the first construction are
    /// reused by every later resolution.
    Screen,
    /// A fresh instance per resolution.
    #[default]
    Component,
}

/// Converts a resolved dependency before it is injected.
pub trait Transform: Send + Sync {
    fn transform(&self, incoming: ServiceRef, args: &[Value]) -> Result<ServiceRef, ResolveError>;
}

pub(super) type FactoryFn = Arc<dyn Fn(&Container) -> Result<ServiceRef, ResolveError> + Send + Sync>;

#[derive(Clone)]
pub(super) enum Provider {
    Instance(ServiceRef),
    Factory {
        factory: FactoryFn,
        lifetime: Lifetime,
    },
}

pub(super) struct ViewModelRegistration {
    pub(super) class: &'static str,
    pub(super) scope: VmScope,
    pub(super) schema: Arc<Schema>,
    pub(super) screen_fields: Option<Fields>,
}

/// A view-model constructed by the container, ready for shape extraction.
#[derive(Debug)]
pub struct ResolvedViewModel {
    pub class: &'static str,
    pub type_id: TypeId,
    pub fields: Fields,
    pub schema: Arc<Schema>,
}
