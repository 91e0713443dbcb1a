//! Module tree builder.
//!
//! Recursively wraps child module configurations. Every child wrapper shares the
//! parent's engine; only the namespace and state path change on the way down.

use crate::wrapper::StoreWrapper;
use std::collections::BTreeMap;
use std::sync::Arc;
use typed_store_core::{ModuleConfig, StoreEngine, child_namespace};

/// Build one wrapper per child module of a module at `parent_namespace` /
/// `parent_path`.
///
/// A namespaced child extends the namespace with its name; any other child reuses the
/// parent's namespace. The state path always extends with the child's name.
#[must_use]
pub fn build_modules(
    parent_namespace: &str,
    parent_path: &[String],
    engine: &Arc<dyn StoreEngine>,
    modules: &BTreeMap<String, ModuleConfig>,
) -> BTreeMap<String, StoreWrapper> {
    modules
        .iter()
        .map(|(name, config)| {
            let namespace = child_namespace(parent_namespace, name, config.is_namespaced());
            let mut state_path = parent_path.to_vec();
            state_path.push(name.clone());

            tracing::trace!(module = %name, namespace = %namespace, "Building module wrapper");
            let wrapper = StoreWrapper::build(engine, config, namespace, state_path);
            (name.clone(), wrapper)
        })
        .collect()
}
