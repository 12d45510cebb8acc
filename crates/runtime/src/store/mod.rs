//! Reactive store primitive.
//!
//! A [`Store`] holds the state materialized from a
//! [`StoreShape`](mvvm_core::StoreShape) and runs the shape's operations
//! against it. Stores live in a [`StoreRegistry`], which guarantees at most one
//! store per id and mirrors every store change on a registry-wide feed.
mod events;
mod handle;
mod registry;

pub use events::{ChangeKind, StoreChange};
pub use handle::Store;
pub use registry::StoreRegistry;
