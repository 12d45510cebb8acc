//! Runtime orchestration for materializing view-models into reactive stores.
//!
//! This crate wires the DI container, shape cache, store registry and host
//! lifecycle bridge into a per-request [`MvvmContext`]. Consumers build one
//! context per logical request (server pass) or page (client pass) and call
//! [`MvvmContext::use_vm`] / [`MvvmContext::use_child_vm`] to obtain stores.
//!
//! Modules are organized by responsibility:
//! - [`api`] exposes the error types downstream callers handle
//! - [`container`] resolves view-models and their injected services
//! - [`store`] is the reactive store primitive and its registry
//! - [`hooks`] hosts lifecycle event sources and the bridge to store hooks
//! - [`factory`] and [`cache`] implement the materialization pipeline
//! - [`payload`] writes hydration payloads on the server pass
pub mod api;
pub mod cache;
pub mod config;
pub mod container;
pub mod context;
pub mod factory;
pub mod hooks;
pub mod payload;
pub mod store;

pub use api::{MvvmError, Result, StoreError};
pub use cache::ShapeCache;
pub use config::{MvvmConfig, RenderPass};
pub use container::{Container, Lifetime, ResolvedViewModel, Transform, VmScope};
pub use context::{MvvmContext, MvvmContextBuilder};
pub use factory::{ViewModelFactory, VmFlags};
pub use hooks::{
    HookCallback, HostEvents, LifecycleBridge, LifecycleHost, NavigationContext, NoopHost, Teardown,
};
pub use payload::{PayloadWriter, capture};
pub use store::{ChangeKind, Store, StoreChange, StoreRegistry};
