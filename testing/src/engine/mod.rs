//! Reference in-memory store engine.
//!
//! [`InMemoryEngine`] implements [`StoreEngine`] with the usual namespaced-store
//! semantics, so wrappers can be exercised end to end without a host framework:
//!
//! - State is one JSON tree; each module's state is nested under its module name
//! - Mutations run synchronously against their module's local state, then mutation
//!   subscribers receive the event and a state snapshot
//! - Actions run asynchronously with an [`ActionContext`]; `before` hooks fire when the
//!   dispatch starts, `after` hooks once the action resolves
//! - Getters are computed on every read
//! - Watchers are re-evaluated after every commit and state replacement
//!
//! No lock is held while subscribers, watchers or plugins run, so they may commit,
//! dispatch or unsubscribe re-entrantly.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use typed_store_core::{CommitOptions, ModuleConfig, StoreEngine};
//! use typed_store_testing::InMemoryEngine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = InMemoryEngine::new(
//!     ModuleConfig::new()
//!         .state(json!({ "count": 0 }))
//!         .mutation("increment", |state, _| {
//!             state["count"] = json!(state["count"].as_i64().unwrap_or(0) + 1);
//!             Ok(())
//!         }),
//! )?;
//!
//! engine.commit("increment", None, CommitOptions::default())?;
//! assert_eq!(engine.state()["count"], json!(1));
//! # Ok(())
//! # }
//! ```

mod listeners;
mod registry;

use crate::config::EngineConfig;
use futures::future::{self, FutureExt};
use listeners::Listeners;
use registry::{Index, ModuleNode, initial_state_tree};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use typed_store_core::namespace::join_path;
use typed_store_core::{
    ActionContext, ActionEvent, ActionFuture, ActionSubscriber, CommitOptions, ConfigError,
    DispatchOptions, HandlerKind, ModuleConfig, MutationEvent, MutationListener, Payload,
    RegisterOptions, StoreEngine, StoreError, Subscription, WatchCallback, WatchGetter,
    WatchOptions, resolve_state_mut,
};

/// The root module is fixed at construction; an empty path names no registrable module.
fn empty_module_path() -> StoreError {
    StoreError::Config(ConfigError::InvalidName {
        kind: HandlerKind::Module,
        name: String::new(),
    })
}

struct Watcher {
    getter: WatchGetter,
    callback: WatchCallback,
    last: Mutex<Payload>,
}

/// In-process store engine.
///
/// Always handled through an `Arc`: action contexts and subscription handles keep a
/// reference back to the engine.
pub struct InMemoryEngine {
    this: Weak<InMemoryEngine>,
    strict: bool,
    state: RwLock<Payload>,
    modules: RwLock<ModuleNode>,
    index: RwLock<Arc<Index>>,
    mutation_listeners: Listeners<MutationListener>,
    action_subscribers: Listeners<ActionSubscriber>,
    watchers: Listeners<Arc<Watcher>>,
}

impl InMemoryEngine {
    /// Create an engine for `root` with the default (strict) configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] when the configuration tree is invalid.
    pub fn new(root: ModuleConfig) -> Result<Arc<Self>, StoreError> {
        Self::with_config(root, EngineConfig::default())
    }

    /// Create an engine for `root` and install `config.plugins`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] when the configuration tree is invalid.
    #[tracing::instrument(skip_all, name = "engine_new")]
    pub fn with_config(root: ModuleConfig, config: EngineConfig) -> Result<Arc<Self>, StoreError> {
        root.validate()?;
        let state = initial_state_tree(&root, &[])?;
        let modules = ModuleNode::from_config(&root);
        let index = Index::build(&modules);

        let engine = Arc::new_cyclic(|this| Self {
            this: this.clone(),
            strict: config.strict,
            state: RwLock::new(state),
            modules: RwLock::new(modules),
            index: RwLock::new(Arc::new(index)),
            mutation_listeners: Listeners::new(),
            action_subscribers: Listeners::new(),
            watchers: Listeners::new(),
        });

        let shared: Arc<dyn StoreEngine> = engine.clone();
        for plugin in &config.plugins {
            tracing::debug!(plugin = plugin.name(), "Installing engine plugin");
            plugin.install(&shared);
        }

        tracing::info!(strict = config.strict, "In-memory engine created");
        Ok(engine)
    }

    /// Number of registered mutation subscribers
    #[must_use]
    pub fn mutation_subscriber_count(&self) -> usize {
        self.mutation_listeners.len()
    }

    /// Number of registered action subscribers
    #[must_use]
    pub fn action_subscriber_count(&self) -> usize {
        self.action_subscribers.len()
    }

    fn current_index(&self) -> Arc<Index> {
        Arc::clone(&self.index.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn rebuild_index(&self) {
        let index = {
            let modules = self.modules.read().unwrap_or_else(PoisonError::into_inner);
            Index::build(&modules)
        };
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(index);
    }

    fn unknown(&self, error: StoreError) -> Result<(), StoreError> {
        if self.strict {
            Err(error)
        } else {
            tracing::error!(error = %error, "Ignoring unknown type");
            Ok(())
        }
    }

    fn notify_watchers(&self, snapshot: &Payload) {
        for watcher in self.watchers.snapshot() {
            let value = (watcher.getter)(snapshot);
            let previous = {
                let mut last = watcher.last.lock().unwrap_or_else(PoisonError::into_inner);
                if *last == value {
                    continue;
                }
                std::mem::replace(&mut *last, value.clone())
            };
            (watcher.callback)(&value, &previous);
        }
    }

    fn fire_after(&self, event: &ActionEvent) {
        let snapshot = self.state();
        for subscriber in self.action_subscribers.snapshot() {
            if let Some(after) = &subscriber.after {
                after(event, &snapshot);
            }
        }
    }

    fn remove_subscription<F>(&self, remove: F) -> Subscription
    where
        F: FnOnce(&Self) + Send + 'static,
    {
        let engine = self.this.clone();
        Subscription::new(move || {
            if let Some(engine) = engine.upgrade() {
                remove(engine.as_ref());
            }
        })
    }
}

impl StoreEngine for InMemoryEngine {
    #[tracing::instrument(skip(self, payload, _options), name = "engine_commit")]
    fn commit(
        &self,
        kind: &str,
        payload: Option<Payload>,
        _options: CommitOptions,
    ) -> Result<(), StoreError> {
        let index = self.current_index();
        let Some(entries) = index.mutations.get(kind) else {
            return self.unknown(StoreError::UnknownMutation(kind.to_string()));
        };

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            for entry in entries {
                let local = resolve_state_mut(&entry.state_path, &mut state)?;
                (entry.handler)(local, payload.as_ref())?;
            }
        }
        tracing::trace!(handlers = entries.len(), "Mutation applied");

        let snapshot = self.state();
        let event = MutationEvent {
            kind: kind.to_string(),
            payload,
        };
        for listener in self.mutation_listeners.snapshot() {
            listener(&event, &snapshot);
        }
        self.notify_watchers(&snapshot);
        Ok(())
    }

    #[tracing::instrument(skip(self, payload, _options), name = "engine_dispatch")]
    fn dispatch(
        &self,
        kind: &str,
        payload: Option<Payload>,
        _options: DispatchOptions,
    ) -> ActionFuture {
        let index = self.current_index();
        let entries = match index.actions.get(kind) {
            Some(entries) if !entries.is_empty() => entries.clone(),
            _ => {
                let outcome = self
                    .unknown(StoreError::UnknownAction(kind.to_string()))
                    .map(|()| Payload::Null);
                return future::ready(outcome).boxed();
            }
        };
        let Some(engine) = self.this.upgrade() else {
            return future::ready(Err(StoreError::ActionFailed(
                "engine has been dropped".to_string(),
            )))
            .boxed();
        };

        let event = ActionEvent {
            kind: kind.to_string(),
            payload: payload.clone(),
        };
        let snapshot = self.state();
        for subscriber in self.action_subscribers.snapshot() {
            if let Some(before) = &subscriber.before {
                before(&event, &snapshot);
            }
        }

        let shared: Arc<dyn StoreEngine> = engine.clone();
        let mut runs: Vec<ActionFuture> = entries
            .iter()
            .map(|entry| {
                let context = ActionContext::new(
                    Arc::clone(&shared),
                    entry.namespace.clone(),
                    entry.state_path.clone(),
                );
                (entry.handler)(context, payload.clone())
            })
            .collect();

        async move {
            let value = if runs.len() == 1 {
                runs.remove(0).await?
            } else {
                Payload::Array(future::try_join_all(runs).await?)
            };
            engine.fire_after(&event);
            Ok(value)
        }
        .boxed()
    }

    fn subscribe(&self, listener: MutationListener) -> Subscription {
        let id = self.mutation_listeners.insert(listener);
        self.remove_subscription(move |engine| engine.mutation_listeners.remove(id))
    }

    fn subscribe_action(&self, subscriber: ActionSubscriber) -> Subscription {
        let id = self.action_subscribers.insert(subscriber);
        self.remove_subscription(move |engine| engine.action_subscribers.remove(id))
    }

    fn state(&self) -> Payload {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn getter(&self, key: &str) -> Result<Payload, StoreError> {
        let index = self.current_index();
        let root = self.state();
        index.evaluate_getter(&root, key)
    }

    fn watch(
        &self,
        getter: WatchGetter,
        callback: WatchCallback,
        options: WatchOptions,
    ) -> Subscription {
        let current = getter(&self.state());
        if options.immediate {
            callback(&current, &Payload::Null);
        }
        let id = self.watchers.insert(Arc::new(Watcher {
            getter,
            callback,
            last: Mutex::new(current),
        }));
        self.remove_subscription(move |engine| engine.watchers.remove(id))
    }

    fn replace_state(&self, state: Payload) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
        tracing::debug!("Root state replaced");
        self.notify_watchers(&self.state());
    }

    #[tracing::instrument(skip(self, module, options), name = "engine_register_module")]
    fn register_module(
        &self,
        path: &[&str],
        module: ModuleConfig,
        options: RegisterOptions,
    ) -> Result<(), StoreError> {
        let Some((name, parent_path)) = path.split_last() else {
            return Err(empty_module_path());
        };
        module.validate()?;
        let module_state = initial_state_tree(&module, path)?;

        {
            let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
            let parent = modules
                .get_mut(parent_path)
                .ok_or_else(|| StoreError::ModuleNotFound(join_path(parent_path)))?;
            if parent.has_child(name) {
                return Err(StoreError::ModuleExists(join_path(path)));
            }

            if !options.preserve_state {
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                let parent_state = resolve_state_mut(parent_path, &mut state)?;
                let object =
                    parent_state
                        .as_object_mut()
                        .ok_or_else(|| StoreError::StateNotFound {
                            path: join_path(path),
                            segment: (*name).to_string(),
                        })?;
                object.insert((*name).to_string(), module_state);
            }
            parent.insert_child((*name).to_string(), ModuleNode::from_config(&module));
        }

        self.rebuild_index();
        tracing::info!(path = %join_path(path), "Module registered");
        self.notify_watchers(&self.state());
        Ok(())
    }

    #[tracing::instrument(skip(self), name = "engine_unregister_module")]
    fn unregister_module(&self, path: &[&str]) -> Result<(), StoreError> {
        let Some((name, parent_path)) = path.split_last() else {
            return Err(empty_module_path());
        };

        {
            let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
            modules
                .get_mut(parent_path)
                .and_then(|parent| parent.remove_child(name))
                .ok_or_else(|| StoreError::ModuleNotFound(join_path(path)))?;

            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(object) = resolve_state_mut(parent_path, &mut state)
                .ok()
                .and_then(Payload::as_object_mut)
            {
                object.remove(*name);
            }
        }

        self.rebuild_index();
        tracing::info!(path = %join_path(path), "Module unregistered");
        self.notify_watchers(&self.state());
        Ok(())
    }

    #[tracing::instrument(skip_all, name = "engine_hot_update")]
    fn hot_update(&self, config: ModuleConfig) -> Result<(), StoreError> {
        config.validate()?;
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .hot_update(&config, "");
        self.rebuild_index();
        tracing::info!("Handlers hot-updated");
        Ok(())
    }
}
