//! Getter proxies.
//!
//! A getter proxy is a read-only accessor bound to one qualified key. Every read goes
//! to the engine's getter table; the configured getter function is never called here
//! and nothing is cached, so reads always reflect the engine's current value.

use crate::metrics::ProxyMetrics;
use crate::proxy::ProxySet;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use typed_store_core::{GetterFn, Payload, StoreEngine, StoreError, qualify};

/// The getters of one module.
pub type Getters = ProxySet<GetterProxy>;

/// Accessor for one getter.
#[derive(Clone)]
pub struct GetterProxy {
    name: String,
    key: String,
    engine: Arc<dyn StoreEngine>,
}

impl GetterProxy {
    /// Local name of the getter
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified key the engine knows the getter by
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the getter's current value.
    ///
    /// # Errors
    ///
    /// Propagates the engine's error, e.g. [`StoreError::UnknownGetter`].
    pub fn get(&self) -> Result<Payload, StoreError> {
        ProxyMetrics::record_getter_read(&self.key);
        tracing::trace!(key = %self.key, "Reading getter");
        self.engine.getter(&self.key)
    }

    /// Read the getter and deserialize it into `T`.
    ///
    /// # Errors
    ///
    /// Propagates the engine's error, or [`StoreError::Serialization`] when the value
    /// does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.get()?)?)
    }
}

impl fmt::Debug for GetterProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetterProxy").field("key", &self.key).finish()
    }
}

impl ProxySet<GetterProxy> {
    /// Read the getter named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownGetter`] when this module has no getter `name`, or
    /// the engine's error.
    pub fn value(&self, name: &str) -> Result<Payload, StoreError> {
        self.get(name)
            .ok_or_else(|| StoreError::UnknownGetter(qualify(name, self.namespace())))?
            .get()
    }
}

/// Build one proxy per configured getter, keyed under `namespace`.
#[must_use]
pub fn build_getters(
    namespace: &str,
    engine: &Arc<dyn StoreEngine>,
    config: &BTreeMap<String, GetterFn>,
) -> Getters {
    let entries = config
        .keys()
        .map(|name| {
            let proxy = GetterProxy {
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
    use typed_store_core::ModuleConfig;
    use typed_store_testing::{RecordedCall, RecordingEngine};

    fn config() -> ModuleConfig {
        ModuleConfig::new()
            .getter("total", |_| unreachable!("proxies never call getter functions"))
            .getter("count", |_| unreachable!("proxies never call getter functions"))
    }

    #[test]
    fn test_reads_qualified_key_from_engine() {
        let recording = RecordingEngine::new();
        recording.set_getter("cart/total", json!(12));
        let engine: Arc<dyn StoreEngine> = Arc::new(recording.clone());

        let getters = build_getters("cart", &engine, config().getters());

        assert_eq!(getters.len(), 2);
        assert_eq!(getters.get("total").unwrap().key(), "cart/total");
        assert_eq!(getters.value("total").unwrap(), json!(12));
        assert_eq!(recording.calls(), vec![RecordedCall::Getter("cart/total".into())]);
    }

    #[test]
    fn test_every_read_hits_the_engine() {
        let recording = RecordingEngine::new();
        recording.set_getter("count", json!(1));
        let engine: Arc<dyn StoreEngine> = Arc::new(recording.clone());
        let getters = build_getters("", &engine, config().getters());
        let count = getters.get("count").unwrap();

        assert_eq!(count.get_as::<i64>().unwrap(), 1);
        recording.set_getter("count", json!(2));
        assert_eq!(count.get_as::<i64>().unwrap(), 2);
        assert_eq!(recording.calls().len(), 2);
    }

    #[test]
    fn test_unknown_name() {
        let engine: Arc<dyn StoreEngine> = Arc::new(RecordingEngine::new());
        let getters = build_getters("cart", &engine, config().getters());
        let err = getters.value("missing").unwrap_err();
        assert!(matches!(err, StoreError::UnknownGetter(key) if key == "cart/missing"));
    }
}
