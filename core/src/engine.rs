//! The store engine boundary.
//!
//! The proxy layer owns no state. Everything it does is routed through the narrow
//! [`StoreEngine`] trait: commits and dispatches go in, mutation and action events come
//! out through subscriptions. One engine instance is shared (as `Arc<dyn StoreEngine>`)
//! by every wrapper in a tree.
//!
//! # Implementations
//!
//! - `InMemoryEngine` (in `typed-store-testing`): reference engine with module
//!   registration, namespaced handlers, getters, watchers and plugins
//! - `RecordingEngine` (in `typed-store-testing`): captures calls for assertions

use crate::Payload;
use crate::config::ModuleConfig;
use crate::error::StoreError;
use crate::subscription::Subscription;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Eventual result of an action dispatch.
pub type ActionFuture = BoxFuture<'static, Result<Payload, StoreError>>;

/// Options for [`StoreEngine::commit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOptions {
    /// Treat the type as already fully qualified instead of prefixing the caller's
    /// namespace.
    pub root: bool,
}

impl CommitOptions {
    /// Options with `root: true`
    #[must_use]
    pub const fn root() -> Self {
        Self { root: true }
    }
}

/// Options for [`StoreEngine::dispatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Treat the type as already fully qualified instead of prefixing the caller's
    /// namespace.
    pub root: bool,
}

impl DispatchOptions {
    /// Options with `root: true`
    #[must_use]
    pub const fn root() -> Self {
        Self { root: true }
    }
}

/// Options for [`StoreEngine::watch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Invoke the callback once at registration with the current value.
    pub immediate: bool,
}

/// Options for [`StoreEngine::register_module`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Keep whatever state already exists at the module path instead of installing the
    /// module's initial state.
    pub preserve_state: bool,
}

/// A committed mutation, as seen by mutation subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationEvent {
    /// Fully qualified mutation key
    pub kind: String,
    /// Payload passed to the commit, if any
    pub payload: Option<Payload>,
}

/// A dispatched action, as seen by action subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEvent {
    /// Fully qualified action key
    pub kind: String,
    /// Payload passed to the dispatch, if any
    pub payload: Option<Payload>,
}

/// Called after every commit with the event and a snapshot of the root state.
pub type MutationListener = Arc<dyn Fn(&MutationEvent, &Payload) + Send + Sync>;

/// Called around every dispatch with the event and a snapshot of the root state.
pub type ActionHook = Arc<dyn Fn(&ActionEvent, &Payload) + Send + Sync>;

/// Computes a watched value from the root state.
pub type WatchGetter = Arc<dyn Fn(&Payload) -> Payload + Send + Sync>;

/// Receives `(new_value, old_value)` whenever a watched value changes.
pub type WatchCallback = Arc<dyn Fn(&Payload, &Payload) + Send + Sync>;

/// Before/after hooks for [`StoreEngine::subscribe_action`].
#[derive(Clone, Default)]
pub struct ActionSubscriber {
    /// Runs before the action handler starts
    pub before: Option<ActionHook>,
    /// Runs after the action handler's result has settled successfully
    pub after: Option<ActionHook>,
}

impl ActionSubscriber {
    /// Subscriber with only a `before` hook.
    pub fn before<F>(hook: F) -> Self
    where
        F: Fn(&ActionEvent, &Payload) + Send + Sync + 'static,
    {
        Self {
            before: Some(Arc::new(hook)),
            after: None,
        }
    }

    /// Subscriber with only an `after` hook.
    pub fn after<F>(hook: F) -> Self
    where
        F: Fn(&ActionEvent, &Payload) + Send + Sync + 'static,
    {
        Self {
            before: None,
            after: Some(Arc::new(hook)),
        }
    }
}

impl fmt::Debug for ActionSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSubscriber")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

/// The reactive store the proxy layer routes through.
///
/// Implementations own the state tree, apply mutations, run actions, and drive the
/// subscription streams. All methods take `&self`; implementations use interior
/// mutability so one instance can be shared by many wrappers.
pub trait StoreEngine: Send + Sync {
    /// Apply the mutation registered under `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownMutation`] when nothing is registered under `kind`,
    /// or whatever error the mutation handler produced.
    fn commit(
        &self,
        kind: &str,
        payload: Option<Payload>,
        options: CommitOptions,
    ) -> Result<(), StoreError>;

    /// Run the action registered under `kind`.
    ///
    /// `before` subscribers fire before this returns. The returned future resolves to
    /// the action's result and fires `after` subscribers when it settles successfully.
    fn dispatch(&self, kind: &str, payload: Option<Payload>, options: DispatchOptions)
    -> ActionFuture;

    /// Register a listener for every committed mutation.
    fn subscribe(&self, listener: MutationListener) -> Subscription;

    /// Register before/after hooks for every dispatched action.
    fn subscribe_action(&self, subscriber: ActionSubscriber) -> Subscription;

    /// Snapshot of the root state tree.
    fn state(&self) -> Payload;

    /// Current value of the getter registered under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownGetter`] when nothing is registered under `key`.
    fn getter(&self, key: &str) -> Result<Payload, StoreError>;

    /// Re-evaluate `getter` after state changes and call `callback` when its value
    /// differs from the previous one.
    fn watch(
        &self,
        getter: WatchGetter,
        callback: WatchCallback,
        options: WatchOptions,
    ) -> Subscription;

    /// Replace the whole root state tree.
    fn replace_state(&self, state: Payload);

    /// Register a module at `path` after construction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ModuleExists`] when a module is already registered at
    /// `path`, [`StoreError::ModuleNotFound`] when the parent path does not exist, or
    /// [`StoreError::Config`] when the module configuration is invalid or `path` is
    /// empty.
    fn register_module(
        &self,
        path: &[&str],
        module: ModuleConfig,
        options: RegisterOptions,
    ) -> Result<(), StoreError>;

    /// Remove a module registered at `path`, together with its state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ModuleNotFound`] when no module is registered at `path`,
    /// or [`StoreError::Config`] when `path` is empty.
    fn unregister_module(&self, path: &[&str]) -> Result<(), StoreError>;

    /// Swap in new getters, mutations and actions while keeping current state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] when the new configuration is invalid.
    fn hot_update(&self, config: ModuleConfig) -> Result<(), StoreError>;
}
