//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from dependency resolution, store access and lifecycle hooks
//! so callers can bubble them up with consistent context.
use thiserror::Error;

use mvvm_core::{ActionError, ResolveError, SerializeError};

pub type Result<T> = std::result::Result<T, MvvmError>;

#[derive(Debug, Error)]
pub enum MvvmError {
    /// A child materialization ran before any root materialization of the class.
    #[error("store `{class}` is not initialized; materialize the root view-model first")]
    UninitializedRoot { class: &'static str },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("class name `{name}` is already bound to a different view-model type")]
    ClassNameCollision { name: &'static str },

    /// A lifecycle hook invoked directly by the runtime (setup) failed.
    #[error("lifecycle hook `{hook}` failed")]
    Hook {
        hook: &'static str,
        #[source]
        source: ActionError,
    },

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error("shape cache lock was poisoned")]
    CacheLockPoisoned,

    #[error("payload lock was poisoned")]
    PayloadLockPoisoned,
}

/// Errors raised by store handles and the store registry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store `{id}` has no derived value `{name}`")]
    UnknownDerived { id: String, name: String },

    #[error("store `{id}` has no operation `{name}`")]
    UnknownOperation { id: String, name: String },

    #[error("operation `{name}` on store `{id}` failed")]
    Action {
        id: String,
        name: String,
        #[source]
        source: ActionError,
    },

    #[error("store `{id}` is disposed")]
    Disposed { id: String },

    #[error("store `{0}` state lock was poisoned")]
    LockPoisoned(String),

    #[error("store registry lock was poisoned")]
    RegistryLockPoisoned,

    #[error(transparent)]
    Serialize(#[from] SerializeError),
}
