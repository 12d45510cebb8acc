use serde::{Deserialize, Serialize};

/// Change notification published by a store and mirrored on the registry feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChange {
    pub store_id: String,
    pub kind: ChangeKind,
}

impl StoreChange {
    pub fn new(store_id: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            store_id: store_id.into(),
            kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeKind {
    /// The registry created the store.
    Created,
    Set { key: String },
    /// Several keys written at once.
    Patch { keys: Vec<String> },
    /// An operation ran; it may have written any key.
    Action { name: String },
    Reset,
    Disposed,
    /// The registry dropped the store.
    Removed,
}
