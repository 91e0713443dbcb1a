//! Configuration for [`InMemoryEngine`](crate::InMemoryEngine).

use std::fmt;
use std::sync::Arc;
use typed_store_core::StoreEngine;

/// Extension installed into an engine once, right after construction.
///
/// Plugins typically subscribe to mutations or actions (see
/// [`LoggerPlugin`](crate::LoggerPlugin)).
pub trait EnginePlugin: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Attach to the freshly constructed engine.
    fn install(&self, engine: &Arc<dyn StoreEngine>);
}

/// Runtime settings for the reference engine.
///
/// # Example
///
/// ```ignore
/// let config = EngineConfig::default()
///     .with_strict(false)
///     .with_plugin(LoggerPlugin::new());
///
/// let engine = InMemoryEngine::with_config(root, config)?;
/// ```
#[derive(Clone)]
pub struct EngineConfig {
    /// Unknown mutation or action types are errors when `true`; when `false` they are
    /// logged and ignored.
    pub strict: bool,
    /// Plugins installed in order after construction
    pub plugins: Vec<Arc<dyn EnginePlugin>>,
}

impl EngineConfig {
    /// Create a configuration with explicit values
    #[must_use]
    pub fn new(strict: bool, plugins: Vec<Arc<dyn EnginePlugin>>) -> Self {
        Self { strict, plugins }
    }

    /// Set strict mode
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Add a plugin
    #[must_use]
    pub fn with_plugin<P: EnginePlugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict: true,
            plugins: Vec::new(),
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("strict", &self.strict)
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
