//! Call-capturing engine for proxy-level assertions.
//!
//! [`RecordingEngine`] applies nothing. It records every commit and dispatch with its
//! options, serves getters from a table the test fills in, and lets the test push
//! mutation and action events at its subscribers directly.

#![allow(clippy::missing_panics_doc)] // Test utilities recover poisoned locks

use futures::future::{self, FutureExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use typed_store_core::{
    ActionEvent, ActionFuture, ActionSubscriber, CommitOptions, DispatchOptions, ModuleConfig,
    MutationEvent, MutationListener, Payload, RegisterOptions, StoreEngine, StoreError,
    Subscription, WatchCallback, WatchGetter, WatchOptions,
};

/// A call the engine received.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// `commit(kind, payload, options)`
    Commit {
        /// Key passed to the engine
        kind: String,
        /// Payload passed to the engine
        payload: Option<Payload>,
        /// Options passed to the engine
        options: CommitOptions,
    },
    /// `dispatch(kind, payload, options)`
    Dispatch {
        /// Key passed to the engine
        kind: String,
        /// Payload passed to the engine
        payload: Option<Payload>,
        /// Options passed to the engine
        options: DispatchOptions,
    },
    /// `getter(key)`
    Getter(String),
    /// `replace_state(state)`
    ReplaceState(Payload),
    /// `register_module(path, ..)`
    RegisterModule(Vec<String>),
    /// `unregister_module(path)`
    UnregisterModule(Vec<String>),
    /// `hot_update(..)`
    HotUpdate,
}

#[derive(Default)]
struct Recorded {
    calls: Vec<RecordedCall>,
    getters: HashMap<String, Payload>,
    dispatch_results: HashMap<String, Payload>,
    state: Payload,
    mutation_listeners: Vec<(u64, MutationListener)>,
    action_subscribers: Vec<(u64, ActionSubscriber)>,
    next_id: u64,
}

/// Engine double that records calls.
#[derive(Clone, Default)]
pub struct RecordingEngine {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingEngine {
    /// Create an empty recording engine
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Only the commit calls, in order
    #[must_use]
    pub fn commits(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, RecordedCall::Commit { .. }))
            .collect()
    }

    /// Only the dispatch calls, in order
    #[must_use]
    pub fn dispatches(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, RecordedCall::Dispatch { .. }))
            .collect()
    }

    /// Serve `value` for getter `key`
    pub fn set_getter(&self, key: impl Into<String>, value: Payload) {
        self.lock().getters.insert(key.into(), value);
    }

    /// Resolve dispatches of `kind` to `value` (default: `null`)
    pub fn set_dispatch_result(&self, kind: impl Into<String>, value: Payload) {
        self.lock().dispatch_results.insert(kind.into(), value);
    }

    /// Set the state returned by `state()`
    pub fn set_state(&self, state: Payload) {
        self.lock().state = state;
    }

    /// Deliver a mutation event to every mutation subscriber
    pub fn emit_mutation(&self, kind: &str, payload: Option<Payload>) {
        let (listeners, state) = {
            let recorded = self.lock();
            let listeners: Vec<_> = recorded
                .mutation_listeners
                .iter()
                .map(|(_, l)| Arc::clone(l))
                .collect();
            (listeners, recorded.state.clone())
        };
        let event = MutationEvent {
            kind: kind.to_string(),
            payload,
        };
        for listener in listeners {
            listener(&event, &state);
        }
    }

    /// Deliver an action event to every `before` hook
    pub fn emit_action_before(&self, kind: &str, payload: Option<Payload>) {
        self.emit_action(kind, payload, |s| s.before.clone());
    }

    /// Deliver an action event to every `after` hook
    pub fn emit_action_after(&self, kind: &str, payload: Option<Payload>) {
        self.emit_action(kind, payload, |s| s.after.clone());
    }

    /// Number of live mutation subscribers
    #[must_use]
    pub fn mutation_subscriber_count(&self) -> usize {
        self.lock().mutation_listeners.len()
    }

    /// Number of live action subscribers
    #[must_use]
    pub fn action_subscriber_count(&self) -> usize {
        self.lock().action_subscribers.len()
    }

    fn emit_action<F>(&self, kind: &str, payload: Option<Payload>, pick: F)
    where
        F: Fn(&ActionSubscriber) -> Option<typed_store_core::ActionHook>,
    {
        let (hooks, state) = {
            let recorded = self.lock();
            let hooks: Vec<_> = recorded
                .action_subscribers
                .iter()
                .filter_map(|(_, s)| pick(s))
                .collect();
            (hooks, recorded.state.clone())
        };
        let event = ActionEvent {
            kind: kind.to_string(),
            payload,
        };
        for hook in hooks {
            hook(&event, &state);
        }
    }

    fn record(&self, call: RecordedCall) {
        self.lock().calls.push(call);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(recorded: &mut Recorded) -> u64 {
        let id = recorded.next_id;
        recorded.next_id += 1;
        id
    }
}

impl StoreEngine for RecordingEngine {
    fn commit(
        &self,
        kind: &str,
        payload: Option<Payload>,
        options: CommitOptions,
    ) -> Result<(), StoreError> {
        self.record(RecordedCall::Commit {
            kind: kind.to_string(),
            payload,
            options,
        });
        Ok(())
    }

    fn dispatch(
        &self,
        kind: &str,
        payload: Option<Payload>,
        options: DispatchOptions,
    ) -> ActionFuture {
        let result = self
            .lock()
            .dispatch_results
            .get(kind)
            .cloned()
            .unwrap_or(Payload::Null);
        self.record(RecordedCall::Dispatch {
            kind: kind.to_string(),
            payload,
            options,
        });
        future::ready(Ok(result)).boxed()
    }

    fn subscribe(&self, listener: MutationListener) -> Subscription {
        let id = {
            let mut recorded = self.lock();
            let id = Self::next_id(&mut recorded);
            recorded.mutation_listeners.push((id, listener));
            id
        };
        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .mutation_listeners
                .retain(|(entry, _)| *entry != id);
        })
    }

    fn subscribe_action(&self, subscriber: ActionSubscriber) -> Subscription {
        let id = {
            let mut recorded = self.lock();
            let id = Self::next_id(&mut recorded);
            recorded.action_subscribers.push((id, subscriber));
            id
        };
        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .action_subscribers
                .retain(|(entry, _)| *entry != id);
        })
    }

    fn state(&self) -> Payload {
        self.lock().state.clone()
    }

    fn getter(&self, key: &str) -> Result<Payload, StoreError> {
        self.record(RecordedCall::Getter(key.to_string()));
        self.lock()
            .getters
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::UnknownGetter(key.to_string()))
    }

    fn watch(
        &self,
        _getter: WatchGetter,
        _callback: WatchCallback,
        _options: WatchOptions,
    ) -> Subscription {
        Subscription::inactive()
    }

    fn replace_state(&self, state: Payload) {
        self.record(RecordedCall::ReplaceState(state.clone()));
        self.lock().state = state;
    }

    fn register_module(
        &self,
        path: &[&str],
        _module: ModuleConfig,
        _options: RegisterOptions,
    ) -> Result<(), StoreError> {
        self.record(RecordedCall::RegisterModule(
            path.iter().map(ToString::to_string).collect(),
        ));
        Ok(())
    }

    fn unregister_module(&self, path: &[&str]) -> Result<(), StoreError> {
        self.record(RecordedCall::UnregisterModule(
            path.iter().map(ToString::to_string).collect(),
        ));
        Ok(())
    }

    fn hot_update(&self, _config: ModuleConfig) -> Result<(), StoreError> {
        self.record(RecordedCall::HotUpdate);
        Ok(())
    }
}
