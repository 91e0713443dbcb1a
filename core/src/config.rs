//! Declarative module configuration.
//!
//! A [`ModuleConfig`] describes one node of the store: its initial state, its getters,
//! mutations and actions, whether it is namespaced, and its child modules. The mapping
//! key of every entry is the handler's canonical name.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use typed_store_core::config::ModuleConfig;
//!
//! let counter = ModuleConfig::new()
//!     .namespaced(true)
//!     .state(json!({ "value": 0 }))
//!     .mutation("bump", |state, _payload| {
//!         let next = state["value"].as_i64().unwrap_or(0) + 1;
//!         state["value"] = json!(next);
//!         Ok(())
//!     });
//!
//! let root = ModuleConfig::new()
//!     .state(json!({ "title": "Hello, world!" }))
//!     .module("counter", counter);
//!
//! assert!(root.validate().is_ok());
//! ```

use crate::Payload;
use crate::context::{ActionContext, GetterContext};
use crate::engine::ActionFuture;
use crate::error::{ConfigError, HandlerKind, StoreError};
use crate::namespace::{child_namespace, is_valid_name, qualify};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Computes a derived value from module state.
pub type GetterFn = Arc<dyn Fn(&GetterContext<'_>) -> Result<Payload, StoreError> + Send + Sync>;

/// Applies a synchronous change to the module's local state.
pub type MutationFn =
    Arc<dyn Fn(&mut Payload, Option<&Payload>) -> Result<(), StoreError> + Send + Sync>;

/// Runs asynchronous work, committing mutations through its context.
pub type ActionFn = Arc<dyn Fn(ActionContext, Option<Payload>) -> ActionFuture + Send + Sync>;

/// One node of the store configuration tree.
#[derive(Clone, Default)]
pub struct ModuleConfig {
    state: Option<Payload>,
    namespaced: bool,
    getters: BTreeMap<String, GetterFn>,
    mutations: BTreeMap<String, MutationFn>,
    actions: BTreeMap<String, ActionFn>,
    modules: BTreeMap<String, ModuleConfig>,
    duplicates: Vec<(HandlerKind, String)>,
}

impl ModuleConfig {
    /// An empty, non-namespaced module.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial state.
    #[must_use]
    pub fn state(mut self, state: Payload) -> Self {
        self.state = Some(state);
        self
    }

    /// Mark the module as namespaced.
    #[must_use]
    pub fn namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = namespaced;
        self
    }

    /// Add a getter.
    #[must_use]
    pub fn getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&GetterContext<'_>) -> Result<Payload, StoreError> + Send + Sync + 'static,
    {
        let getter: GetterFn = Arc::new(getter);
        insert_entry(
            &mut self.getters,
            &mut self.duplicates,
            HandlerKind::Getter,
            name.into(),
            getter,
        );
        self
    }

    /// Add a mutation.
    #[must_use]
    pub fn mutation<F>(mut self, name: impl Into<String>, mutation: F) -> Self
    where
        F: Fn(&mut Payload, Option<&Payload>) -> Result<(), StoreError> + Send + Sync + 'static,
    {
        let mutation: MutationFn = Arc::new(mutation);
        insert_entry(
            &mut self.mutations,
            &mut self.duplicates,
            HandlerKind::Mutation,
            name.into(),
            mutation,
        );
        self
    }

    /// Add an action.
    #[must_use]
    pub fn action<F, Fut>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(ActionContext, Option<Payload>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, StoreError>> + Send + 'static,
    {
        let action: ActionFn = Arc::new(
            move |context: ActionContext, payload: Option<Payload>| -> ActionFuture {
                Box::pin(action(context, payload))
            },
        );
        insert_entry(
            &mut self.actions,
            &mut self.duplicates,
            HandlerKind::Action,
            name.into(),
            action,
        );
        self
    }

    /// Add a child module.
    #[must_use]
    pub fn module(mut self, name: impl Into<String>, module: ModuleConfig) -> Self {
        insert_entry(
            &mut self.modules,
            &mut self.duplicates,
            HandlerKind::Module,
            name.into(),
            module,
        );
        self
    }

    /// The initial state; an empty object when none was set.
    #[must_use]
    pub fn initial_state(&self) -> Payload {
        self.state
            .clone()
            .unwrap_or_else(|| Payload::Object(serde_json::Map::new()))
    }

    /// Whether the module contributes its name to the namespace.
    #[must_use]
    pub const fn is_namespaced(&self) -> bool {
        self.namespaced
    }

    /// Configured getters by name.
    #[must_use]
    pub const fn getters(&self) -> &BTreeMap<String, GetterFn> {
        &self.getters
    }

    /// Configured mutations by name.
    #[must_use]
    pub const fn mutations(&self) -> &BTreeMap<String, MutationFn> {
        &self.mutations
    }

    /// Configured actions by name.
    #[must_use]
    pub const fn actions(&self) -> &BTreeMap<String, ActionFn> {
        &self.actions
    }

    /// Child modules by name.
    #[must_use]
    pub const fn modules(&self) -> &BTreeMap<String, ModuleConfig> {
        &self.modules
    }

    /// Check the whole tree for duplicate and malformed names.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, walking modules depth-first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_in("", "")
    }

    fn validate_in(&self, namespace: &str, path: &str) -> Result<(), ConfigError> {
        if let Some((kind, name)) = self.duplicates.first() {
            return Err(ConfigError::DuplicateHandler {
                kind: *kind,
                name: name.clone(),
                namespace: namespace.to_string(),
            });
        }

        check_names(HandlerKind::Getter, self.getters.keys())?;
        check_names(HandlerKind::Mutation, self.mutations.keys())?;
        check_names(HandlerKind::Action, self.actions.keys())?;
        check_names(HandlerKind::Module, self.modules.keys())?;

        let state_is_object = self.state.as_ref().is_none_or(Payload::is_object);
        if !self.modules.is_empty() && !state_is_object {
            return Err(ConfigError::NonObjectState {
                path: path.to_string(),
            });
        }

        for (name, module) in &self.modules {
            module.validate_in(
                &child_namespace(namespace, name, module.namespaced),
                &qualify(name, path),
            )?;
        }
        Ok(())
    }
}

impl fmt::Debug for ModuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleConfig")
            .field("namespaced", &self.namespaced)
            .field("state", &self.state)
            .field("getters", &self.getters.keys().collect::<Vec<_>>())
            .field("mutations", &self.mutations.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("modules", &self.modules)
            .finish()
    }
}

fn insert_entry<V>(
    map: &mut BTreeMap<String, V>,
    duplicates: &mut Vec<(HandlerKind, String)>,
    kind: HandlerKind,
    name: String,
    value: V,
) {
    if map.contains_key(&name) {
        duplicates.push((kind, name));
    } else {
        map.insert(name, value);
    }
}

fn check_names<'a>(
    kind: HandlerKind,
    names: impl Iterator<Item = &'a String>,
) -> Result<(), ConfigError> {
    for name in names {
        if !is_valid_name(name) {
            return Err(ConfigError::InvalidName {
                kind,
                name: name.clone(),
            });
        }
    }
    Ok(())
}
