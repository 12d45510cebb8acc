//! Public error surface of the runtime.
//!
//! Gathers the error types callers of the factory and stores handle, so the
//! orchestration modules stay focused on their own concerns.

pub mod errors;

pub use errors::{MvvmError, Result, StoreError};
