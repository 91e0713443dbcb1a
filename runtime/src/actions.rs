//! Action proxies.
//!
//! Each proxy dispatches one qualified key with `root: true` and exposes `before` and
//! `after` hooks filtered to that key. For a single dispatch, every `before` hook
//! registered at dispatch time runs before the action body starts; `after` hooks run
//! once the action's result has settled successfully. Both receive the dispatched
//! payload, never the action's result.

use crate::metrics::ProxyMetrics;
use crate::proxy::ProxySet;
use futures::future::{self, FutureExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use typed_store_core::{
    ActionEvent, ActionFn, ActionFuture, ActionHook, ActionSubscriber, DispatchOptions, Payload,
    StoreEngine, StoreError, Subscription, qualify,
};

/// The actions of one module.
pub type Actions = ProxySet<ActionProxy>;

/// Dispatchable, observable handle for one action.
#[derive(Clone)]
pub struct ActionProxy {
    name: String,
    key: String,
    engine: Arc<dyn StoreEngine>,
}

impl ActionProxy {
    /// Local name of the action
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified key the engine knows the action by
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Dispatch the action with `payload`, which may be absent.
    ///
    /// The returned future resolves to whatever the engine's dispatch resolves to.
    /// Dropping it does not cancel work the engine already started.
    #[tracing::instrument(skip(self, payload), fields(key = %self.key), name = "action_invoke")]
    pub fn invoke(&self, payload: Option<Payload>) -> ActionFuture {
        ProxyMetrics::record_dispatch(&self.key);
        tracing::debug!("Dispatching action");
        self.engine.dispatch(&self.key, payload, DispatchOptions::root())
    }

    /// Serialize `payload` and dispatch it.
    ///
    /// A payload that fails to serialize yields a future resolving to
    /// [`StoreError::Serialization`] without reaching the engine.
    pub fn call<T: Serialize + ?Sized>(&self, payload: &T) -> ActionFuture {
        match serde_json::to_value(payload) {
            Ok(value) => self.invoke(Some(value)),
            Err(error) => future::ready(Err(StoreError::from(error))).boxed(),
        }
    }

    /// Dispatch without a payload.
    pub fn trigger(&self) -> ActionFuture {
        self.invoke(None)
    }

    /// Dispatch `payload` and deserialize the result into `R`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] when the payload or the result cannot be
    /// converted, otherwise the engine's dispatch error.
    pub async fn call_as<T, R>(&self, payload: &T) -> Result<R, StoreError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let value = self.call(payload).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Run `handler` with the payload of each dispatch of this action, before the
    /// action body starts.
    pub fn before<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Option<&Payload>) + Send + Sync + 'static,
    {
        let subscriber = ActionSubscriber {
            before: Some(self.filtered(handler)),
            after: None,
        };
        self.subscribe(subscriber)
    }

    /// Run `handler` with the payload of each dispatch of this action, after its
    /// result has settled.
    pub fn after<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Option<&Payload>) + Send + Sync + 'static,
    {
        let subscriber = ActionSubscriber {
            before: None,
            after: Some(self.filtered(handler)),
        };
        self.subscribe(subscriber)
    }

    fn filtered<F>(&self, handler: F) -> ActionHook
    where
        F: Fn(Option<&Payload>) + Send + Sync + 'static,
    {
        let key = self.key.clone();
        Arc::new(move |event: &ActionEvent, _state: &Payload| {
            if event.kind == key {
                handler(event.payload.as_ref());
            }
        })
    }

    fn subscribe(&self, subscriber: ActionSubscriber) -> Subscription {
        ProxyMetrics::record_subscription(&self.key);
        self.engine.subscribe_action(subscriber)
    }
}

impl fmt::Debug for ActionProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionProxy").field("key", &self.key).finish()
    }
}

impl ProxySet<ActionProxy> {
    /// Dispatch the action named `name`.
    ///
    /// An unknown name yields a future resolving to [`StoreError::UnknownAction`].
    pub fn dispatch(&self, name: &str, payload: Option<Payload>) -> ActionFuture {
        match self.get(name) {
            Some(action) => action.invoke(payload),
            None => future::ready(Err(StoreError::UnknownAction(qualify(
                name,
                self.namespace(),
            ))))
            .boxed(),
        }
    }
}

/// Build one proxy per configured action, keyed under `namespace`.
#[must_use]
pub fn build_actions(
    namespace: &str,
    engine: &Arc<dyn StoreEngine>,
    config: &BTreeMap<String, ActionFn>,
) -> Actions {
    let entries = config
        .keys()
        .map(|name| {
            let proxy = ActionProxy {
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
    use typed_store_testing::{RecordedCall, RecordingEngine};

    fn setup(namespace: &str) -> (RecordingEngine, Actions) {
        let recording = RecordingEngine::new();
        let engine: Arc<dyn StoreEngine> = Arc::new(recording.clone());
        let config = ModuleConfig::new()
            .action("load", |_ctx, _payload| async { Ok::<_, StoreError>(Payload::Null) })
            .action("save", |_ctx, _payload| async { Ok::<_, StoreError>(Payload::Null) });
        let actions = build_actions(namespace, &engine, config.actions());
        (recording, actions)
    }

    #[tokio::test]
    async fn test_invoke_dispatches_with_root_flag() {
        let (recording, actions) = setup("cart");
        recording.set_dispatch_result("cart/load", json!(42));

        let result = actions
            .get("load")
            .unwrap()
            .call(&json!({ "id": 1 }))
            .await
            .unwrap();

        assert_eq!(result, json!(42));
        assert_eq!(
            recording.dispatches(),
            vec![RecordedCall::Dispatch {
                kind: "cart/load".to_string(),
                payload: Some(json!({ "id": 1 })),
                options: DispatchOptions { root: true },
            }]
        );
    }

    #[tokio::test]
    async fn test_call_as_deserializes_result() {
        let (recording, actions) = setup("");
        recording.set_dispatch_result("load", json!([1, 2, 3]));

        let ids: Vec<u32> = actions.get("load").unwrap().call_as(&()).await.unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_before_and_after_filter_by_key() {
        let (recording, actions) = setup("cart");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let before_sink = Arc::clone(&seen);
        let load = actions.get("load").unwrap();
        let before = load.before(move |payload| {
            before_sink.lock().unwrap().push(("before", payload.cloned()));
        });
        let after_sink = Arc::clone(&seen);
        let after = load.after(move |payload| {
            after_sink.lock().unwrap().push(("after", payload.cloned()));
        });

        recording.emit_action_before("cart/save", Some(json!(0)));
        recording.emit_action_before("cart/load", Some(json!(1)));
        recording.emit_action_after("cart/load", Some(json!(1)));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("before", Some(json!(1))), ("after", Some(json!(1)))]
        );

        before.unsubscribe();
        after.unsubscribe();
        after.unsubscribe();
        assert_eq!(recording.action_subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_name_resolves_to_error() {
        let (recording, actions) = setup("cart");
        let err = actions.dispatch("missing", None).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownAction(key) if key == "cart/missing"));
        assert!(recording.dispatches().is_empty());
    }
}
