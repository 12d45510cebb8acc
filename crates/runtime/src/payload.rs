//! Hydration payload writer for the server pass.
//!
//! The writer listens to the registry feed and, after every store change,
//! rebuilds the shared payload from the snapshots of all live stores. Injected
//! entries never reach the payload; stores removed from the registry drop out
//! of it on the next rebuild.
use std::sync::{Arc, RwLock};

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use mvvm_core::HydrationPayload;

use crate::api::Result;
use crate::store::StoreRegistry;

/// Snapshot of every live store in `registry`, keyed by class name.
///
/// Stores that cannot be snapshotted are logged and left out.
pub fn capture(registry: &StoreRegistry) -> Result<HydrationPayload> {
    let mut payload = HydrationPayload::new();
    for (class, snapshot) in registry.snapshots()? {
        payload.insert(class, snapshot);
    }
    Ok(payload)
}

/// Background task mirroring the registry into a shared payload.
pub struct PayloadWriter {
    handle: JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

impl PayloadWriter {
    /// Spawns the writer on the current tokio runtime.
    ///
    /// Dropping the returned handle also stops the writer.
    pub fn spawn(registry: Arc<StoreRegistry>, payload: Arc<RwLock<HydrationPayload>>) -> Self {
        let changes = registry.subscribe();
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(registry, payload, changes, shutdown_rx));
        Self { handle, shutdown }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the writer after a final rebuild and waits for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            error!(target: "mvvm::payload", "payload writer task failed: {}", e);
        }
    }
}

async fn run(
    registry: Arc<StoreRegistry>,
    payload: Arc<RwLock<HydrationPayload>>,
    mut changes: broadcast::Receiver<crate::store::StoreChange>,
    mut shutdown: oneshot::Receiver<()>,
) {
    info!(target: "mvvm::payload", "payload writer started");
    rebuild(&registry, &payload);

    loop {
        tokio::select! {
            change = changes.recv() => {
                match change {
                    Ok(change) => {
                        debug!(
                            target: "mvvm::payload",
                            store = %change.store_id,
                            change = change.kind.as_ref(),
                            "store changed"
                        );
                        rebuild(&registry, &payload);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // A full capture covers the skipped changes.
                        warn!(target: "mvvm::payload", skipped, "payload writer lagged");
                        rebuild(&registry, &payload);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(target: "mvvm::payload", "registry feed closed");
                        break;
                    }
                }
            }
            _ = &mut shutdown => {
                debug!(target: "mvvm::payload", "shutdown requested");
                break;
            }
        }
    }

    rebuild(&registry, &payload);
    info!(target: "mvvm::payload", "payload writer stopped");
}

fn rebuild(registry: &StoreRegistry, payload: &RwLock<HydrationPayload>) {
    let captured = match capture(registry) {
        Ok(captured) => captured,
        Err(e) => {
            error!(target: "mvvm::payload", "failed to capture payload: {}", e);
            return;
        }
    };

    match payload.write() {
        Ok(mut guard) => *guard = captured,
        Err(_) => error!(target: "mvvm::payload", "payload lock poisoned"),
    }
}
