//! Services injected into the sample view-models.
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct LoggerService;

impl LoggerService {
    pub fn info(&self, message: &str) {
        tracing::info!(target: "playground", "{}", message);
    }
}

/// Counts in-flight submissions per key.
#[derive(Debug, Default)]
pub struct SendingService {
    keys: Mutex<HashMap<String, u32>>,
}

impl SendingService {
    pub fn begin(&self, key: &str) {
        if let Ok(mut keys) = self.keys.lock() {
            *keys.entry(key.to_string()).or_default() += 1;
        }
    }

    pub fn end(&self, key: &str) {
        if let Ok(mut keys) = self.keys.lock()
            && let Some(count) = keys.get_mut(key)
        {
            *count = count.saturating_sub(1);
        }
    }

    pub fn is_sending(&self, key: &str) -> bool {
        self.keys
            .lock()
            .map(|keys| keys.get(key).is_some_and(|count| *count > 0))
            .unwrap_or(false)
    }
}

/// Keeps the last error reported by a view-model.
#[derive(Debug, Default)]
pub struct ErrorService {
    last: Mutex<Option<String>>,
}

impl ErrorService {
    pub fn setup(&self, error: impl Into<String>) {
        if let Ok(mut last) = self.last.lock() {
            *last = Some(error.into());
        }
    }

    pub fn last(&self) -> Option<String> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}
