//! The Store Wrapper.
//!
//! A [`StoreWrapper`] is the typed face of one module: its state view, its getter,
//! mutation and action proxies, and one wrapper per child module. The root wrapper
//! additionally passes the engine's store-wide operations through unchanged.
//!
//! Proxies are derived once, from the configuration handed to [`StoreWrapper::new`].
//! Modules added with [`StoreWrapper::register_module`] or handlers swapped in with
//! [`StoreWrapper::hot_update`] reach the engine, but the wrapper's proxy sets keep
//! describing the original configuration.

use crate::actions::{Actions, build_actions};
use crate::getters::{Getters, build_getters};
use crate::modules::build_modules;
use crate::mutations::{Mutations, build_mutations};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use typed_store_core::{
    ActionFuture, ActionSubscriber, CommitOptions, ConfigError, DispatchOptions, ModuleConfig,
    MutationEvent, Payload, RegisterOptions, StoreEngine, StoreError, Subscription, WatchOptions,
    resolve_state,
};

/// Typed view over one module of a store engine.
#[derive(Clone)]
pub struct StoreWrapper {
    engine: Arc<dyn StoreEngine>,
    namespace: String,
    state_path: Vec<String>,
    getters: Getters,
    mutations: Mutations,
    actions: Actions,
    modules: BTreeMap<String, Self>,
}

impl StoreWrapper {
    /// Wrap `engine` using the root module configuration it was created from.
    ///
    /// The configuration tree is validated before any proxy is built.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found in the configuration tree.
    #[tracing::instrument(skip_all, name = "store_wrapper_new")]
    pub fn new(engine: Arc<dyn StoreEngine>, config: &ModuleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let wrapper = Self::build(&engine, config, String::new(), Vec::new());
        tracing::info!(
            getters = wrapper.getters.len(),
            mutations = wrapper.mutations.len(),
            actions = wrapper.actions.len(),
            modules = wrapper.modules.len(),
            "Store wrapper built"
        );
        Ok(wrapper)
    }

    /// Build the wrapper for an already validated module.
    pub(crate) fn build(
        engine: &Arc<dyn StoreEngine>,
        config: &ModuleConfig,
        namespace: String,
        state_path: Vec<String>,
    ) -> Self {
        let getters = build_getters(&namespace, engine, config.getters());
        let mutations = build_mutations(&namespace, engine, config.mutations());
        let actions = build_actions(&namespace, engine, config.actions());
        let modules = build_modules(&namespace, &state_path, engine, config.modules());

        Self {
            engine: Arc::clone(engine),
            namespace,
            state_path,
            getters,
            mutations,
            actions,
            modules,
        }
    }

    /// Namespace this module's keys are qualified with (empty for the root and for
    /// plain modules under the root).
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Module names from the root down to this module.
    #[must_use]
    pub fn state_path(&self) -> &[String] {
        &self.state_path
    }

    /// Current state of this module.
    ///
    /// Reads a fresh snapshot from the engine on every call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StateNotFound`] when the module's state is not present
    /// in the root state tree, e.g. after the module was unregistered.
    pub fn state(&self) -> Result<Payload, StoreError> {
        let root = self.engine.state();
        resolve_state(&self.state_path, &root).cloned()
    }

    /// Current state of this module, deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StateNotFound`] or [`StoreError::Serialization`].
    pub fn state_as<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.state()?)?)
    }

    /// Getter proxies of this module
    #[must_use]
    pub fn getters(&self) -> &Getters {
        &self.getters
    }

    /// Mutation proxies of this module
    #[must_use]
    pub fn mutations(&self) -> &Mutations {
        &self.mutations
    }

    /// Action proxies of this module
    #[must_use]
    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    /// Wrappers for the direct child modules, by name
    #[must_use]
    pub fn modules(&self) -> &BTreeMap<String, Self> {
        &self.modules
    }

    /// Wrapper for the direct child module `name`.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&Self> {
        self.modules.get(name)
    }

    /// Wrapper for the descendant module at `path`, relative to this module.
    ///
    /// An empty path returns `self`.
    #[must_use]
    pub fn module_at(&self, path: &[&str]) -> Option<&Self> {
        path.iter().try_fold(self, |wrapper, name| wrapper.module(name))
    }

    /// The shared engine
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn StoreEngine> {
        &self.engine
    }

    /// Commit `kind` directly on the engine.
    ///
    /// # Errors
    ///
    /// Propagates the engine's commit error.
    pub fn commit(
        &self,
        kind: &str,
        payload: Option<Payload>,
        options: CommitOptions,
    ) -> Result<(), StoreError> {
        self.engine.commit(kind, payload, options)
    }

    /// Dispatch `kind` directly on the engine.
    pub fn dispatch(
        &self,
        kind: &str,
        payload: Option<Payload>,
        options: DispatchOptions,
    ) -> ActionFuture {
        self.engine.dispatch(kind, payload, options)
    }

    /// Listen to every committed mutation.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&MutationEvent, &Payload) + Send + Sync + 'static,
    {
        self.engine.subscribe(Arc::new(listener))
    }

    /// Hook every dispatched action.
    pub fn subscribe_action(&self, subscriber: ActionSubscriber) -> Subscription {
        self.engine.subscribe_action(subscriber)
    }

    /// Watch a value computed from the root state.
    pub fn watch<G, C>(&self, getter: G, callback: C, options: WatchOptions) -> Subscription
    where
        G: Fn(&Payload) -> Payload + Send + Sync + 'static,
        C: Fn(&Payload, &Payload) + Send + Sync + 'static,
    {
        self.engine.watch(Arc::new(getter), Arc::new(callback), options)
    }

    /// Replace the engine's root state.
    pub fn replace_state(&self, state: Payload) {
        tracing::debug!("Replacing root state");
        self.engine.replace_state(state);
    }

    /// Register a module on the engine at `path`.
    ///
    /// The new module's handlers are reachable through the engine and the
    /// pass-through operations, but this wrapper's proxy sets are not rebuilt.
    ///
    /// # Errors
    ///
    /// Propagates the engine's registration error.
    #[tracing::instrument(skip(self, module, options))]
    pub fn register_module(
        &self,
        path: &[&str],
        module: ModuleConfig,
        options: RegisterOptions,
    ) -> Result<(), StoreError> {
        self.engine.register_module(path, module, options)
    }

    /// Unregister the module at `path` from the engine.
    ///
    /// # Errors
    ///
    /// Propagates the engine's error.
    #[tracing::instrument(skip(self))]
    pub fn unregister_module(&self, path: &[&str]) -> Result<(), StoreError> {
        self.engine.unregister_module(path)
    }

    /// Swap the engine's handlers for those in `config`, keeping state.
    ///
    /// # Errors
    ///
    /// Propagates the engine's error.
    #[tracing::instrument(skip_all)]
    pub fn hot_update(&self, config: ModuleConfig) -> Result<(), StoreError> {
        self.engine.hot_update(config)
    }
}

impl fmt::Debug for StoreWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreWrapper")
            .field("namespace", &self.namespace)
            .field("state_path", &self.state_path)
            .field("getters", &self.getters.names().collect::<Vec<_>>())
            .field("mutations", &self.mutations.names().collect::<Vec<_>>())
            .field("actions", &self.actions.names().collect::<Vec<_>>())
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;
    use typed_store_core::HandlerKind;
    use typed_store_testing::{RecordedCall, RecordingEngine, fixtures};

    fn wrap(config: &ModuleConfig) -> (RecordingEngine, StoreWrapper) {
        let recording = RecordingEngine::new();
        let engine: Arc<dyn StoreEngine> = Arc::new(recording.clone());
        let wrapper = StoreWrapper::new(engine, config).unwrap();
        (recording, wrapper)
    }

    #[test]
    fn test_state_view_follows_module_path() {
        let config = ModuleConfig::new()
            .module("outer", ModuleConfig::new().module("inner", fixtures::counter_module(false)));
        let (recording, store) = wrap(&config);
        recording.set_state(json!({ "outer": { "inner": { "value": 3 } } }));

        let inner = store.module_at(&["outer", "inner"]).unwrap();
        assert_eq!(inner.state().unwrap(), json!({ "value": 3 }));
        assert_eq!(store.module_at(&[]).unwrap().namespace(), "");
        assert!(store.module_at(&["outer", "missing"]).is_none());
    }

    #[test]
    fn test_state_view_reports_missing_module_state() {
        let config = ModuleConfig::new().module("m", fixtures::counter_module(true));
        let (recording, store) = wrap(&config);
        recording.set_state(json!({}));

        let err = store.module("m").unwrap().state().unwrap_err();
        assert!(matches!(err, StoreError::StateNotFound { .. }));
    }

    #[test]
    fn test_state_as_deserializes() {
        #[derive(serde::Deserialize)]
        struct Counter {
            value: i64,
        }

        let config = ModuleConfig::new().module("m", fixtures::counter_module(true));
        let (recording, store) = wrap(&config);
        recording.set_state(json!({ "m": { "value": 7 } }));

        let counter: Counter = store.module("m").unwrap().state_as().unwrap();
        assert_eq!(counter.value, 7);
    }

    #[test]
    fn test_invalid_config_is_rejected_before_building() {
        let config = ModuleConfig::new().module("a/b", ModuleConfig::new());
        let engine: Arc<dyn StoreEngine> = Arc::new(RecordingEngine::new());

        let err = StoreWrapper::new(engine, &config).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidName {
                kind: HandlerKind::Module,
                name: "a/b".to_string(),
            }
        );
    }

    #[test]
    fn test_pass_through_reaches_engine_unchanged() {
        let (recording, store) = wrap(&fixtures::title_store());

        store
            .commit("setTitle", Some(json!({ "title": "x" })), CommitOptions::default())
            .unwrap();
        store
            .register_module(&["extra"], ModuleConfig::new(), RegisterOptions::default())
            .unwrap();
        store.hot_update(fixtures::title_store()).unwrap();

        assert_eq!(
            recording.calls(),
            vec![
                RecordedCall::Commit {
                    kind: "setTitle".to_string(),
                    payload: Some(json!({ "title": "x" })),
                    options: CommitOptions { root: false },
                },
                RecordedCall::RegisterModule(vec!["extra".to_string()]),
                RecordedCall::HotUpdate,
            ]
        );
    }

    #[test]
    fn test_clones_share_engine() {
        let (_, store) = wrap(&fixtures::title_store());
        let clone = store.clone();
        assert!(Arc::ptr_eq(store.engine(), clone.engine()));
        assert_eq!(clone.mutations().get("setTitle").unwrap().key(), "setTitle");
    }
}
