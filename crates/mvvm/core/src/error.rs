//! Error types shared by view-model construction, operations and payload
//! serialization.
use thiserror::Error;

/// Failures raised while resolving a view-model or one of its dependencies.
///
/// These are produced by the DI container (or by a view-model's own
/// constructor) and are propagated to the caller unchanged.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no provider registered for token `{token}`")]
    MissingProvider { token: String },

    #[error("token `{token}` resolved to `{found}`, expected `{expected}`")]
    TypeMismatch {
        token: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{class}` has no resolved dependency at parameter {index}")]
    MissingParameter { class: &'static str, index: usize },

    #[error("no transform registered for token `{token}`")]
    MissingTransform { token: String },

    #[error("factory for `{token}` failed: {message}")]
    Factory { token: String, message: String },

    #[error("failed to construct `{class}`: {message}")]
    Construct { class: &'static str, message: String },

    #[error("container lock was poisoned")]
    LockPoisoned,
}

/// Failures raised inside a store operation or lifecycle hook.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error("state field `{0}` is missing")]
    MissingField(String),

    #[error("state field `{key}` is not {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("argument {index} is invalid: {message}")]
    InvalidArgument { index: usize, message: String },

    #[error("{0}")]
    Failed(String),
}

impl ActionError {
    pub fn failed(message: impl Into<String>) -> Self {
        ActionError::Failed(message.into())
    }
}

/// Failures raised while turning a state into a plain-data payload entry.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// A live reference reached the serialization boundary without being
    /// flagged as injected.
    #[error("state field `{key}` holds an unflagged live `{type_name}` reference")]
    LiveReference { key: String, type_name: &'static str },

    #[error("payload JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload entry for `{class}` is not an object")]
    MalformedEntry { class: String },
}
