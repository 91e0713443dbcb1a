//! Host-framework injection.
//!
//! A host runtime creates components in a tree. Once the store plugin is installed
//! into a runtime, every component initialized through it is bound to a store
//! wrapper: the one its options declare (directly or through a zero-argument
//! factory), or else the one bound to its nearest ancestor.
//!
//! Installation is guarded by an [`InstallToken`] the plugin hands back. The token is
//! tied to one runtime, so a component cannot be initialized against a runtime the
//! plugin was never installed into.
//!
//! ```ignore
//! let mut runtime = HostRuntime::new();
//! let token = StorePlugin::install(&mut runtime);
//!
//! let root = runtime.init_component(&token, ComponentOptions::new().with_store(store), None)?;
//! let child = runtime.init_component(&token, ComponentOptions::new(), Some(&root))?;
//! assert!(child.store().is_some());
//! ```

use crate::wrapper::StoreWrapper;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// Errors raised while binding a store to a component.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The token was issued by an install into a different runtime.
    #[error("Install token belongs to runtime {token_runtime}, not runtime {runtime}")]
    TokenMismatch {
        /// Runtime the token was issued for
        token_runtime: u64,
        /// Runtime the component was initialized in
        runtime: u64,
    },

    /// The store plugin was never installed into this runtime.
    #[error("Store plugin is not installed into runtime {0}")]
    NotInstalled(u64),
}

/// Proof that the store plugin was installed into a specific runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstallToken {
    runtime: u64,
}

impl InstallToken {
    /// Id of the runtime this token was issued for
    #[must_use]
    pub const fn runtime_id(&self) -> u64 {
        self.runtime
    }
}

/// Creates a store wrapper on demand.
pub type StoreFactory = Arc<dyn Fn() -> StoreWrapper + Send + Sync>;

/// How a component's options declare its store.
#[derive(Clone)]
pub enum StoreSource {
    /// An existing wrapper, shared as-is
    Instance(Arc<StoreWrapper>),
    /// A zero-argument factory, called once per component initialization
    Factory(StoreFactory),
}

impl StoreSource {
    fn resolve(&self) -> Arc<StoreWrapper> {
        match self {
            Self::Instance(store) => Arc::clone(store),
            Self::Factory(factory) => Arc::new(factory()),
        }
    }
}

impl fmt::Debug for StoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(store) => f.debug_tuple("Instance").field(store).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Options a component is initialized with.
#[derive(Debug, Clone, Default)]
pub struct ComponentOptions {
    store: Option<StoreSource>,
}

impl ComponentOptions {
    /// Options that declare no store
    #[must_use]
    pub const fn new() -> Self {
        Self { store: None }
    }

    /// Declare an existing wrapper.
    #[must_use]
    pub fn with_store(mut self, store: impl Into<Arc<StoreWrapper>>) -> Self {
        self.store = Some(StoreSource::Instance(store.into()));
        self
    }

    /// Declare a factory called when the component is initialized.
    #[must_use]
    pub fn with_store_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> StoreWrapper + Send + Sync + 'static,
    {
        self.store = Some(StoreSource::Factory(Arc::new(factory)));
        self
    }

    /// The declared store source, if any
    #[must_use]
    pub const fn store(&self) -> Option<&StoreSource> {
        self.store.as_ref()
    }
}

/// An initialized component and the store bound to it.
#[derive(Debug, Clone, Default)]
pub struct Component {
    store: Option<Arc<StoreWrapper>>,
}

impl Component {
    /// The bound store, if the component or one of its ancestors declared one
    #[must_use]
    pub const fn store(&self) -> Option<&Arc<StoreWrapper>> {
        self.store.as_ref()
    }
}

/// A host runtime components are initialized in.
#[derive(Debug)]
pub struct HostRuntime {
    id: u64,
    installed: Option<InstallToken>,
}

impl Default for HostRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRuntime {
    /// Create a runtime with a fresh id and no plugin installed
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed),
            installed: None,
        }
    }

    /// Id of this runtime
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Whether the store plugin is installed
    #[must_use]
    pub const fn is_installed(&self) -> bool {
        self.installed.is_some()
    }

    /// Initialize a component, binding its store.
    ///
    /// The store declared in `options` wins; a factory is called exactly once here.
    /// Without one, the component inherits `parent`'s binding, which is itself
    /// inherited, so the nearest ancestor that declared a store provides it.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotInstalled`] if the plugin was never installed into this
    /// runtime, or [`HostError::TokenMismatch`] if `token` came from another runtime.
    pub fn init_component(
        &self,
        token: &InstallToken,
        options: ComponentOptions,
        parent: Option<&Component>,
    ) -> Result<Component, HostError> {
        let installed = self.installed.ok_or(HostError::NotInstalled(self.id))?;
        if *token != installed {
            return Err(HostError::TokenMismatch {
                token_runtime: token.runtime,
                runtime: self.id,
            });
        }

        let store = match options.store {
            Some(source) => Some(source.resolve()),
            None => parent.and_then(|parent| parent.store.clone()),
        };
        tracing::trace!(runtime = self.id, bound = store.is_some(), "Component initialized");
        Ok(Component { store })
    }
}

/// Installs store injection into a host runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorePlugin;

impl StorePlugin {
    /// Install into `runtime` and return its token.
    ///
    /// Installing twice into the same runtime logs a warning and returns the token
    /// from the first install.
    pub fn install(runtime: &mut HostRuntime) -> InstallToken {
        if let Some(token) = runtime.installed {
            tracing::warn!(
                runtime = runtime.id,
                "Store plugin already installed; ignoring repeated install"
            );
            return token;
        }

        let token = InstallToken {
            runtime: runtime.id,
        };
        runtime.installed = Some(token);
        tracing::debug!(runtime = runtime.id, "Store plugin installed");
        token
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::atomic::AtomicUsize;
    use typed_store_core::{ModuleConfig, StoreEngine};
    use typed_store_testing::{RecordingEngine, fixtures};

    fn wrapper() -> StoreWrapper {
        let engine: Arc<dyn StoreEngine> = Arc::new(RecordingEngine::new());
        StoreWrapper::new(engine, &fixtures::title_store()).unwrap()
    }

    #[test]
    fn test_double_install_returns_same_token() {
        fixtures::init_tracing();
        let mut runtime = HostRuntime::new();

        let first = StorePlugin::install(&mut runtime);
        let second = StorePlugin::install(&mut runtime);

        assert_eq!(first, second);
        assert_eq!(first.runtime_id(), runtime.id());
        assert!(runtime.is_installed());
    }

    #[test]
    fn test_child_inherits_nearest_ancestor_store() {
        let mut runtime = HostRuntime::new();
        let token = StorePlugin::install(&mut runtime);
        let store = Arc::new(wrapper());

        let root = runtime
            .init_component(&token, ComponentOptions::new().with_store(Arc::clone(&store)), None)
            .unwrap();
        let child = runtime
            .init_component(&token, ComponentOptions::new(), Some(&root))
            .unwrap();
        let grandchild = runtime
            .init_component(&token, ComponentOptions::new(), Some(&child))
            .unwrap();

        assert!(Arc::ptr_eq(grandchild.store().unwrap(), &store));
    }

    #[test]
    fn test_own_store_overrides_ancestor() {
        let mut runtime = HostRuntime::new();
        let token = StorePlugin::install(&mut runtime);
        let outer = Arc::new(wrapper());
        let inner = Arc::new(wrapper());

        let root = runtime
            .init_component(&token, ComponentOptions::new().with_store(Arc::clone(&outer)), None)
            .unwrap();
        let child = runtime
            .init_component(
                &token,
                ComponentOptions::new().with_store(Arc::clone(&inner)),
                Some(&root),
            )
            .unwrap();

        assert!(Arc::ptr_eq(child.store().unwrap(), &inner));
    }

    #[test]
    fn test_factory_runs_once_per_component() {
        let mut runtime = HostRuntime::new();
        let token = StorePlugin::install(&mut runtime);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let options = ComponentOptions::new().with_store_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let engine: Arc<dyn StoreEngine> = Arc::new(RecordingEngine::new());
            StoreWrapper::new(engine, &ModuleConfig::new()).unwrap()
        });
        let component = runtime.init_component(&token, options, None).unwrap();

        assert!(component.store().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_component_without_store_or_parent_is_unbound() {
        let mut runtime = HostRuntime::new();
        let token = StorePlugin::install(&mut runtime);
        let component = runtime
            .init_component(&token, ComponentOptions::new(), None)
            .unwrap();
        assert!(component.store().is_none());
    }

    #[test]
    fn test_foreign_token_is_rejected() {
        let mut first = HostRuntime::new();
        let mut second = HostRuntime::new();
        let first_token = StorePlugin::install(&mut first);
        StorePlugin::install(&mut second);

        let err = second
            .init_component(&first_token, ComponentOptions::new(), None)
            .unwrap_err();
        assert_eq!(
            err,
            HostError::TokenMismatch {
                token_runtime: first.id(),
                runtime: second.id(),
            }
        );
    }

    #[test]
    fn test_uninstalled_runtime_is_rejected() {
        let mut installed = HostRuntime::new();
        let token = StorePlugin::install(&mut installed);
        let bare = HostRuntime::new();

        let err = bare
            .init_component(&token, ComponentOptions::new(), None)
            .unwrap_err();
        assert_eq!(err, HostError::NotInstalled(bare.id()));
    }
}
