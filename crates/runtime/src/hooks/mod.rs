//! Lifecycle plumbing between a render host and stores.
//!
//! # Architecture
//!
//! - A [`LifecycleHost`] is the host's event source for one view instance
//! - [`LifecycleBridge::bind`] subscribes a store to every host event; each
//!   callback invokes the store's hook only when the store declares the
//!   matching capability, so undeclared hooks are silent no-ops
//! - The setup hook never comes from the host: the factory runs it through
//!   [`LifecycleBridge::setup`] right after the store is created
//! - The unmount event additionally tears the store down
//!
//! [`HostEvents`] is an in-process host the embedding renderer drives
//! directly; [`NoopHost`] is used for child materializations.
mod bridge;
mod host;

pub use bridge::{LifecycleBridge, Teardown};
pub use host::{HookCallback, HostEvents, LifecycleHost, NavigationContext, NoopHost};
