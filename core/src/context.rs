//! Contexts handed to getter and action handlers.
//!
//! Handlers are written against their own module: a getter sees its module's local
//! state, an action commits and dispatches by local name. The contexts translate those
//! local views into qualified engine calls.

use crate::Payload;
use crate::engine::{ActionFuture, CommitOptions, DispatchOptions, StoreEngine};
use crate::error::StoreError;
use crate::namespace::qualify;
use crate::state::resolve_state;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// Read access to the engine's getter table while a getter is being computed.
pub trait GetterLookup {
    /// Value of the getter registered under the fully qualified `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownGetter`] when nothing is registered under `key`.
    fn lookup(&self, key: &str) -> Result<Payload, StoreError>;
}

/// What a getter can read while computing its value.
pub struct GetterContext<'a> {
    state: &'a Payload,
    root_state: &'a Payload,
    namespace: &'a str,
    getters: &'a dyn GetterLookup,
}

impl<'a> GetterContext<'a> {
    /// Create a context for a getter declared in `namespace`.
    #[must_use]
    pub fn new(
        state: &'a Payload,
        root_state: &'a Payload,
        namespace: &'a str,
        getters: &'a dyn GetterLookup,
    ) -> Self {
        Self {
            state,
            root_state,
            namespace,
            getters,
        }
    }

    /// The declaring module's local state.
    #[must_use]
    pub const fn state(&self) -> &Payload {
        self.state
    }

    /// The whole state tree.
    #[must_use]
    pub const fn root_state(&self) -> &Payload {
        self.root_state
    }

    /// Namespace of the declaring module.
    #[must_use]
    pub const fn namespace(&self) -> &str {
        self.namespace
    }

    /// Another getter of the same module, by local name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownGetter`] when the module has no such getter.
    pub fn getter(&self, name: &str) -> Result<Payload, StoreError> {
        self.getters.lookup(&qualify(name, self.namespace))
    }

    /// Any getter, by fully qualified key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownGetter`] when nothing is registered under `key`.
    pub fn root_getter(&self, key: &str) -> Result<Payload, StoreError> {
        self.getters.lookup(key)
    }
}

impl fmt::Debug for GetterContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetterContext")
            .field("namespace", &self.namespace)
            .field("state", self.state)
            .finish_non_exhaustive()
    }
}

/// What an action can do while it runs.
///
/// Owned and cheap to clone so it can move into the action's future.
#[derive(Clone)]
pub struct ActionContext {
    engine: Arc<dyn StoreEngine>,
    namespace: String,
    state_path: Vec<String>,
}

impl ActionContext {
    /// Create a context for an action declared in `namespace`, whose module state lives
    /// at `state_path`.
    #[must_use]
    pub fn new(engine: Arc<dyn StoreEngine>, namespace: String, state_path: Vec<String>) -> Self {
        Self {
            engine,
            namespace,
            state_path,
        }
    }

    /// Namespace of the declaring module.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Commit a mutation of the same module, by local name.
    ///
    /// # Errors
    ///
    /// Propagates the engine's commit error.
    pub fn commit(&self, kind: &str, payload: Option<Payload>) -> Result<(), StoreError> {
        self.commit_with(kind, payload, CommitOptions::default())
    }

    /// Commit with explicit options. `root: true` treats `kind` as fully qualified.
    ///
    /// # Errors
    ///
    /// Propagates the engine's commit error.
    pub fn commit_with(
        &self,
        kind: &str,
        payload: Option<Payload>,
        options: CommitOptions,
    ) -> Result<(), StoreError> {
        let key = self.local_key(kind, options.root);
        self.engine.commit(&key, payload, CommitOptions::root())
    }

    /// Dispatch an action of the same module, by local name.
    #[must_use]
    pub fn dispatch(&self, kind: &str, payload: Option<Payload>) -> ActionFuture {
        self.dispatch_with(kind, payload, DispatchOptions::default())
    }

    /// Dispatch with explicit options. `root: true` treats `kind` as fully qualified.
    #[must_use]
    pub fn dispatch_with(
        &self,
        kind: &str,
        payload: Option<Payload>,
        options: DispatchOptions,
    ) -> ActionFuture {
        let key = self.local_key(kind, options.root);
        self.engine.dispatch(&key, payload, DispatchOptions::root())
    }

    /// Snapshot of the declaring module's local state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StateNotFound`] if the module's state has been removed.
    pub fn state(&self) -> Result<Payload, StoreError> {
        let root = self.engine.state();
        resolve_state(&self.state_path, &root).cloned()
    }

    /// Local state deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StateNotFound`] or [`StoreError::Serialization`].
    pub fn state_as<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.state()?)?)
    }

    /// Snapshot of the whole state tree.
    #[must_use]
    pub fn root_state(&self) -> Payload {
        self.engine.state()
    }

    /// A getter of the same module, by local name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownGetter`] when the module has no such getter.
    pub fn getter(&self, name: &str) -> Result<Payload, StoreError> {
        self.engine.getter(&qualify(name, &self.namespace))
    }

    /// Any getter, by fully qualified key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownGetter`] when nothing is registered under `key`.
    pub fn root_getter(&self, key: &str) -> Result<Payload, StoreError> {
        self.engine.getter(key)
    }

    fn local_key(&self, kind: &str, root: bool) -> String {
        if root {
            kind.to_string()
        } else {
            qualify(kind, &self.namespace)
        }
    }
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("namespace", &self.namespace)
            .field("state_path", &self.state_path)
            .finish_non_exhaustive()
    }
}
