//! Host-side lifecycle event sources.
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use mvvm_core::{ActionError, LifecycleEvent, Outcome, ServiceRef, Value};

/// Callback a host invokes when a lifecycle event fires.
pub type HookCallback = Arc<dyn Fn(&[Value]) -> Result<Outcome, ActionError> + Send + Sync>;

/// Live navigation objects the host exposes to view-models.
#[derive(Clone, Debug)]
pub struct NavigationContext {
    pub route: ServiceRef,
    pub router: ServiceRef,
}

/// A source of lifecycle events for one view instance.
pub trait LifecycleHost: Send + Sync {
    /// Subscribes `callback` to `event`.
    fn on(&self, event: LifecycleEvent, callback: HookCallback);

    /// Current route and router, when the host has navigation.
    fn navigation(&self) -> Option<NavigationContext> {
        None
    }
}

/// Host that never fires; used for child materializations.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHost;

impl LifecycleHost for NoopHost {
    fn on(&self, _event: LifecycleEvent, _callback: HookCallback) {}
}

/// In-process event source the embedding renderer drives by calling
/// [`HostEvents::emit`].
///
/// Every subscriber receives the event even when an earlier one fails. Each
/// failure is reported to [`LifecycleEvent::ErrorCaptured`] subscribers with
/// the error message as the only argument; the first one is returned to the
/// emitter.
#[derive(Default)]
pub struct HostEvents {
    subscribers: RwLock<HashMap<LifecycleEvent, Vec<HookCallback>>>,
    navigation: Option<NavigationContext>,
}

impl HostEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_navigation(navigation: NavigationContext) -> Self {
        Self {
            subscribers: RwLock::default(),
            navigation: Some(navigation),
        }
    }

    /// Calls every subscriber of `event` in subscription order.
    pub fn emit(&self, event: LifecycleEvent, args: &[Value]) -> Result<Vec<Outcome>, ActionError> {
        let callbacks = self.callbacks(event);
        tracing::trace!(
            target: "mvvm::bridge",
            %event,
            subscribers = callbacks.len(),
            "emitting host event"
        );

        let mut outcomes = Vec::with_capacity(callbacks.len());
        let mut first_error = None;
        for callback in callbacks {
            match callback(args) {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    self.capture(event, &err);
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(outcomes),
        }
    }

    /// Like [`HostEvents::emit`], then awaits every pending outcome in order.
    ///
    /// Used for [`LifecycleEvent::ServerPrefetch`]. Every pending outcome is
    /// awaited; each asynchronous failure is reported and the first is
    /// returned.
    pub async fn emit_async(
        &self,
        event: LifecycleEvent,
        args: &[Value],
    ) -> Result<Vec<Value>, ActionError> {
        let outcomes = self.emit(event, args)?;

        let mut values = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        for outcome in outcomes {
            match outcome.resolve().await {
                Ok(value) => values.push(value),
                Err(err) => {
                    self.capture(event, &err);
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(values),
        }
    }

    pub fn subscriber_count(&self, event: LifecycleEvent) -> usize {
        self.subscribers
            .read()
            .map(|subscribers| subscribers.get(&event).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Drops every subscription.
    pub fn clear(&self) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn callbacks(&self, event: LifecycleEvent) -> Vec<HookCallback> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .cloned()
            .unwrap_or_default()
    }

    fn capture(&self, event: LifecycleEvent, err: &ActionError) {
        tracing::warn!(target: "mvvm::bridge", %event, error = %err, "lifecycle callback failed");
        if event == LifecycleEvent::ErrorCaptured {
            return;
        }

        let args = [Value::String(err.to_string())];
        for callback in self.callbacks(LifecycleEvent::ErrorCaptured) {
            if let Err(nested) = callback(&args) {
                tracing::warn!(
                    target: "mvvm::bridge",
                    error = %nested,
                    "error handler failed"
                );
            }
        }
    }
}

impl LifecycleHost for HostEvents {
    fn on(&self, event: LifecycleEvent, callback: HookCallback) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event)
            .or_default()
            .push(callback);
    }

    fn navigation(&self) -> Option<NavigationContext> {
        self.navigation.clone()
    }
}

impl std::fmt::Debug for HostEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let events: Vec<String> = self
            .subscribers
            .read()
            .map(|subscribers| subscribers.keys().map(ToString::to_string).collect())
            .unwrap_or_default();
        f.debug_struct("HostEvents")
            .field("events", &events)
            .field("navigation", &self.navigation.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> HookCallback {
        let log = log.clone();
        Arc::new(move |args: &[Value]| {
            let arg = args.first().and_then(Value::as_str).unwrap_or("-");
            log.lock().unwrap().push(format!("{tag}:{arg}"));
            Ok(Outcome::done())
        })
    }

    #[test]
    fn test_emit_in_subscription_order() {
        let host = HostEvents::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        host.on(LifecycleEvent::Mounted, recorder(&log, "a"));
        host.on(LifecycleEvent::Mounted, recorder(&log, "b"));

        let outcomes = host.emit(LifecycleEvent::Mounted, &[]).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["a:-", "b:-"]);
        assert!(host.emit(LifecycleEvent::Updated, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_failure_is_captured_then_returned() {
        let host = HostEvents::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        host.on(
            LifecycleEvent::Mounted,
            Arc::new(|_: &[Value]| Err(ActionError::failed("mount failed"))),
        );
        host.on(LifecycleEvent::Mounted, recorder(&log, "after"));
        host.on(
            LifecycleEvent::Mounted,
            Arc::new(|_: &[Value]| Err(ActionError::failed("second failed"))),
        );
        host.on(LifecycleEvent::ErrorCaptured, recorder(&log, "captured"));

        let err = host.emit(LifecycleEvent::Mounted, &[]).unwrap_err();
        assert!(matches!(err, ActionError::Failed(ref msg) if msg == "mount failed"));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["captured:mount failed", "after:-", "captured:second failed"]
        );
    }

    #[tokio::test]
    async fn test_emit_async_forwards_pending_failure() {
        let host = HostEvents::new();
        host.on(
            LifecycleEvent::ServerPrefetch,
            Arc::new(|_: &[Value]| Ok(Outcome::pending(async { Err(ActionError::failed("fetch failed")) }))),
        );

        let err = host
            .emit_async(LifecycleEvent::ServerPrefetch, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Failed(ref msg) if msg == "fetch failed"));
    }

    #[test]
    fn test_clear() {
        let host = HostEvents::new();
        host.on(LifecycleEvent::Mounted, Arc::new(|_: &[Value]| Ok(Outcome::done())));
        assert_eq!(host.subscriber_count(LifecycleEvent::Mounted), 1);

        host.clear();
        assert_eq!(host.subscriber_count(LifecycleEvent::Mounted), 0);
    }
}
