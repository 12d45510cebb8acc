//! View-model to store materialization primitives.
//!
//! `mvvm-core` holds the deterministic half of the bridge between declared
//! view-models and reactive stores: the state model, injection metadata,
//! declared schemas, lifecycle capabilities, and the algorithms that derive a
//! [`StoreShape`] from a resolved view-model and an optional hydration payload.
//! The runtime crate layers the DI container, store registry, host lifecycle
//! bridge and factory on top of the types re-exported here.
pub mod error;
pub mod filter;
pub mod hydration;
pub mod lifecycle;
pub mod schema;
pub mod shape;
pub mod state;
pub mod token;
pub mod view_model;

pub use error::{ActionError, ResolveError, SerializeError};
pub use filter::SerializationFilter;
pub use hydration::{HydrationCoordinator, HydrationPayload};
pub use lifecycle::{
    LifecycleCaps, LifecycleEvent, OnActivated, OnBeforeMount, OnBeforeRouteLeave,
    OnBeforeRouteUpdate, OnBeforeUnmount, OnDeactivated, OnErrorCaptured, OnMounted,
    OnRenderTracked, OnRenderTriggered, OnServerPrefetch, OnSetup, OnUnmounted, OnUpdated,
};
pub use schema::{
    ActionContext, ActionFn, DerivedFn, Outcome, PendingAction, Schema, SchemaBuilder,
};
pub use shape::{ShapeBuilder, StoreShape};
pub use state::{ServiceRef, State, StateEntry, Value, short_type_name};
pub use token::{InjectionMetadata, InjectionToken, MetadataRegistry, TokenDescriptor, TransformDescriptor};
pub use view_model::{Dependencies, Fields, ViewModel};
