//! Store logger plugin.
//!
//! Logs every committed mutation and every dispatched action through `tracing`, under
//! the `typed_store::logger` target.
//!
//! ```ignore
//! let config = EngineConfig::default().with_plugin(
//!     LoggerPlugin::new().with_filter(|kind| !kind.starts_with("ui/")),
//! );
//! let engine = InMemoryEngine::with_config(root, config)?;
//! ```

use crate::config::EnginePlugin;
use std::fmt;
use std::sync::Arc;
use typed_store_core::{ActionEvent, ActionSubscriber, MutationEvent, Payload, StoreEngine};

type KindFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Plugin that logs mutations and actions.
#[derive(Clone)]
pub struct LoggerPlugin {
    filter: Option<KindFilter>,
    log_actions: bool,
}

impl LoggerPlugin {
    /// Log every mutation and action
    #[must_use]
    pub fn new() -> Self {
        Self {
            filter: None,
            log_actions: true,
        }
    }

    /// Only log types for which `filter` returns `true`
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Toggle action logging
    #[must_use]
    pub const fn with_actions(mut self, log_actions: bool) -> Self {
        self.log_actions = log_actions;
        self
    }
}

impl Default for LoggerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn allowed(filter: Option<&KindFilter>, kind: &str) -> bool {
    filter.is_none_or(|filter| filter(kind))
}

impl EnginePlugin for LoggerPlugin {
    fn name(&self) -> &str {
        "logger"
    }

    fn install(&self, engine: &Arc<dyn StoreEngine>) {
        let filter = self.filter.clone();
        // The engine owns these subscriptions for its whole lifetime
        let _mutations = engine.subscribe(Arc::new(move |event: &MutationEvent, state: &Payload| {
            if allowed(filter.as_ref(), &event.kind) {
                tracing::info!(
                    target: "typed_store::logger",
                    kind = %event.kind,
                    payload = ?event.payload,
                    next_state = %state,
                    "mutation"
                );
            }
        }));

        if self.log_actions {
            let before_filter = self.filter.clone();
            let after_filter = self.filter.clone();
            let _actions = engine.subscribe_action(ActionSubscriber {
                before: Some(Arc::new(move |event: &ActionEvent, _state: &Payload| {
                    if allowed(before_filter.as_ref(), &event.kind) {
                        tracing::info!(
                            target: "typed_store::logger",
                            kind = %event.kind,
                            payload = ?event.payload,
                            "action started"
                        );
                    }
                })),
                after: Some(Arc::new(move |event: &ActionEvent, _state: &Payload| {
                    if allowed(after_filter.as_ref(), &event.kind) {
                        tracing::info!(
                            target: "typed_store::logger",
                            kind = %event.kind,
                            "action finished"
                        );
                    }
                })),
            });
        }
    }
}

impl fmt::Debug for LoggerPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerPlugin")
            .field("filtered", &self.filter.is_some())
            .field("log_actions", &self.log_actions)
            .finish()
    }
}
