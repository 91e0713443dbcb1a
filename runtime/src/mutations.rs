//! Mutation proxies.
//!
//! Each proxy commits one qualified key with `root: true` (the key already carries the
//! full namespace) and can filter the engine's mutation stream down to that key.
//!
//! ```ignore
//! let set_title = store.mutations().get("setTitle").unwrap();
//!
//! let subscription = set_title.listen(|payload| println!("title set: {payload:?}"));
//! set_title.call(&json!({ "title": "x" }))?;
//! subscription.unsubscribe();
//! ```

use crate::metrics::ProxyMetrics;
use crate::proxy::ProxySet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use typed_store_core::{
    CommitOptions, MutationEvent, MutationFn, MutationListener, Payload, StoreEngine, StoreError,
    Subscription, qualify,
};

/// The mutations of one module.
pub type Mutations = ProxySet<MutationProxy>;

/// Callable, listenable handle for one mutation.
#[derive(Clone)]
pub struct MutationProxy {
    name: String,
    key: String,
    engine: Arc<dyn StoreEngine>,
}

impl MutationProxy {
    /// Local name of the mutation
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified key the engine knows the mutation by
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Commit the mutation with `payload`, which may be absent.
    ///
    /// Results in exactly one engine commit of `(key, payload, root: true)`.
    ///
    /// # Errors
    ///
    /// Propagates the engine's commit error unchanged.
    #[tracing::instrument(skip(self, payload), fields(key = %self.key), name = "mutation_invoke")]
    pub fn invoke(&self, payload: Option<Payload>) -> Result<(), StoreError> {
        ProxyMetrics::record_commit(&self.key);
        tracing::debug!("Committing mutation");
        self.engine.commit(&self.key, payload, CommitOptions::root())
    }

    /// Serialize `payload` and commit it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if `payload` cannot be serialized, otherwise
    /// the engine's commit error.
    pub fn call<T: Serialize + ?Sized>(&self, payload: &T) -> Result<(), StoreError> {
        self.invoke(Some(serde_json::to_value(payload)?))
    }

    /// Commit without a payload.
    ///
    /// # Errors
    ///
    /// Propagates the engine's commit error unchanged.
    pub fn trigger(&self) -> Result<(), StoreError> {
        self.invoke(None)
    }

    /// Call `handler` with the payload of every commit of this mutation.
    ///
    /// The returned handle stops delivery; calling it more than once is harmless.
    pub fn listen<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Option<&Payload>) + Send + Sync + 'static,
    {
        let key = self.key.clone();
        let listener: MutationListener = Arc::new(move |event: &MutationEvent, _state: &Payload| {
            if event.kind == key {
                tracing::trace!(key = %key, "Delivering mutation to listener");
                handler(event.payload.as_ref());
            }
        });
        ProxyMetrics::record_subscription(&self.key);
        self.engine.subscribe(listener)
    }
}

impl fmt::Debug for MutationProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationProxy").field("key", &self.key).finish()
    }
}

impl ProxySet<MutationProxy> {
    /// Commit the mutation named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownMutation`] when this module has no mutation `name`,
    /// or the engine's commit error.
    pub fn commit(&self, name: &str, payload: Option<Payload>) -> Result<(), StoreError> {
        self.get(name)
            .ok_or_else(|| StoreError::UnknownMutation(qualify(name, self.namespace())))?
            .invoke(payload)
    }
}

/// Build one proxy per configured mutation, keyed under `namespace`.
#[must_use]
pub fn build_mutations(
    namespace: &str,
    engine: &Arc<dyn StoreEngine>,
    config: &BTreeMap<String, MutationFn>,
) -> Mutations {
    let entries = config
        .keys()
        .map(|name| {
            let proxy = MutationProxy {
                name: name.clone(),
                key: qualify(name, namespace),
                engine: Arc::clone(engine),
            };
            (name.clone(), proxy)
        })
        .collect();
    ProxySet::new(namespace.to_string(), entries)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use typed_store_core::ModuleConfig;
    use typed_store_testing::{RecordedCall, RecordingEngine, fixtures};

    fn setup(namespace: &str) -> (RecordingEngine, Mutations) {
        let recording = RecordingEngine::new();
        let engine: Arc<dyn StoreEngine> = Arc::new(recording.clone());
        let config = ModuleConfig::new()
            .mutation("setTitle", fixtures::set_title)
            .mutation("bump", fixtures::bump);
        let mutations = build_mutations(namespace, &engine, config.mutations());
        (recording, mutations)
    }

    #[test]
    fn test_invoke_commits_once_with_root_flag() {
        let (recording, mutations) = setup("m");

        mutations
            .get("setTitle")
            .unwrap()
            .call(&json!({ "title": "x" }))
            .unwrap();

        assert_eq!(
            recording.calls(),
            vec![RecordedCall::Commit {
                kind: "m/setTitle".to_string(),
                payload: Some(json!({ "title": "x" })),
                options: CommitOptions { root: true },
            }]
        );
    }

    #[test]
    fn test_missing_payload_is_forwarded_as_absent() {
        let (recording, mutations) = setup("");
        mutations.get("bump").unwrap().trigger().unwrap();
        mutations.commit("bump", None).unwrap();

        let commits = recording.commits();
        assert_eq!(commits.len(), 2);
        assert!(commits.iter().all(|call| matches!(
            call,
            RecordedCall::Commit { kind, payload: None, .. } if kind == "bump"
        )));
    }

    #[test]
    fn test_listen_filters_by_exact_key() {
        let (recording, mutations) = setup("m");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let subscription = mutations.get("bump").unwrap().listen(move |payload| {
            sink.lock().unwrap().push(payload.cloned());
        });

        recording.emit_mutation("m/bump", Some(json!(1)));
        recording.emit_mutation("m/bumpAll", Some(json!(2)));
        recording.emit_mutation("bump", Some(json!(3)));
        recording.emit_mutation("m/bump", None);

        assert_eq!(*seen.lock().unwrap(), vec![Some(json!(1)), None]);

        subscription.unsubscribe();
        subscription.unsubscribe();
        recording.emit_mutation("m/bump", Some(json!(4)));

        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(recording.mutation_subscriber_count(), 0);
    }

    #[test]
    fn test_unknown_name_is_reported_with_qualified_key() {
        let (_, mutations) = setup("cart");
        let err = mutations.commit("missing", None).unwrap_err();
        assert!(matches!(err, StoreError::UnknownMutation(key) if key == "cart/missing"));
    }
}
