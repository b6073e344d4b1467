//! Settings update listeners.
//!
//! Listeners are registered when an index is opened and called, in order,
//! after every applied settings update. A failing listener (an `Err` or a
//! panic) is logged and skipped; the rest still run and the update stands.

use crate::settings::Settings;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, warn};

type Callback = dyn Fn(&Settings) -> anyhow::Result<()> + Send + Sync;

/// A named update callback.
#[derive(Clone)]
pub struct SettingsListener {
    name: String,
    callback: Arc<Callback>,
}

impl SettingsListener {
    /// Create a listener. The name identifies it in failure logs.
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Settings) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callback: Arc::new(callback),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, settings: &Settings) -> Result<(), String> {
        match catch_unwind(AssertUnwindSafe(|| (self.callback)(settings))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(format!("{err:#}")),
            Err(panic) => Err(panic_message(panic.as_ref())),
        }
    }
}

impl fmt::Debug for SettingsListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsListener")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Ordered, immutable set of update listeners.
///
/// Extending the set produces a new registry; the original is untouched.
#[derive(Clone, Default)]
pub struct UpdateListeners {
    listeners: Arc<[SettingsListener]>,
}

impl UpdateListeners {
    pub fn new(listeners: impl IntoIterator<Item = SettingsListener>) -> Self {
        Self {
            listeners: listeners.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SettingsListener> {
        self.listeners.iter()
    }

    /// Listener names in call order.
    pub fn names(&self) -> Vec<&str> {
        self.listeners.iter().map(SettingsListener::name).collect()
    }

    /// A new registry with `extra` called before the existing listeners.
    pub fn with_prepended(&self, extra: impl IntoIterator<Item = SettingsListener>) -> Self {
        Self::new(extra.into_iter().chain(self.listeners.iter().cloned()))
    }

    /// A new registry with `extra` called after the existing listeners.
    pub fn with_appended(&self, extra: impl IntoIterator<Item = SettingsListener>) -> Self {
        Self::new(self.listeners.iter().cloned().chain(extra))
    }

    /// Call every listener in order. Returns the number that failed.
    pub fn notify_all(&self, settings: &Settings) -> usize {
        let mut failures = 0;
        for listener in self.listeners.iter() {
            match listener.call(settings) {
                Ok(()) => debug!(listener = %listener.name, "Settings listener notified"),
                Err(error) => {
                    failures += 1;
                    warn!(
                        listener = %listener.name,
                        error = %error,
                        settings = ?settings.as_map(),
                        "failed to refresh index settings"
                    );
                }
            }
        }
        failures
    }
}

impl fmt::Debug for UpdateListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FromIterator<SettingsListener> for UpdateListeners {
    fn from_iter<I: IntoIterator<Item = SettingsListener>>(iter: I) -> Self {
        Self::new(iter)
    }
}
