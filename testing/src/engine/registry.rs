//! Module registry and the handler index derived from it.
//!
//! The registry is the live module tree: it changes on `register_module`,
//! `unregister_module` and `hot_update`. After each change the flat [`Index`] is rebuilt
//! from it; commits, dispatches and getter reads only ever consult the index.

use std::collections::{BTreeMap, HashMap};
use typed_store_core::context::{GetterContext, GetterLookup};
use typed_store_core::namespace::{child_namespace, join_path, qualify};
use typed_store_core::{
    ActionFn, GetterFn, ModuleConfig, MutationFn, Payload, StoreError, resolve_state,
};

/// One registered module and its children.
pub(crate) struct ModuleNode {
    namespaced: bool,
    getters: BTreeMap<String, GetterFn>,
    mutations: BTreeMap<String, MutationFn>,
    actions: BTreeMap<String, ActionFn>,
    children: BTreeMap<String, ModuleNode>,
}

impl ModuleNode {
    pub(crate) fn from_config(config: &ModuleConfig) -> Self {
        Self {
            namespaced: config.is_namespaced(),
            getters: config.getters().clone(),
            mutations: config.mutations().clone(),
            actions: config.actions().clone(),
            children: config
                .modules()
                .iter()
                .map(|(name, child)| (name.clone(), Self::from_config(child)))
                .collect(),
        }
    }

    /// Swap handlers for the ones in `config`, recursing into existing children.
    pub(crate) fn hot_update(&mut self, config: &ModuleConfig, path: &str) {
        self.namespaced = config.is_namespaced();
        self.getters = config.getters().clone();
        self.mutations = config.mutations().clone();
        self.actions = config.actions().clone();

        for (name, child_config) in config.modules() {
            let child_path = qualify(name, path);
            match self.children.get_mut(name) {
                Some(child) => child.hot_update(child_config, &child_path),
                None => tracing::warn!(
                    path = %child_path,
                    "Hot update cannot add new modules, a full reload is needed"
                ),
            }
        }
    }

    pub(crate) fn get_mut(&mut self, path: &[&str]) -> Option<&mut Self> {
        path.iter().try_fold(self, |node, segment| node.children.get_mut(*segment))
    }

    pub(crate) fn has_child(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    pub(crate) fn insert_child(&mut self, name: String, child: Self) {
        self.children.insert(name, child);
    }

    pub(crate) fn remove_child(&mut self, name: &str) -> Option<Self> {
        self.children.remove(name)
    }
}

/// A mutation handler and where its local state lives.
#[derive(Clone)]
pub(crate) struct MutationEntry {
    pub(crate) handler: MutationFn,
    pub(crate) state_path: Vec<String>,
}

/// An action handler with the context it runs in.
#[derive(Clone)]
pub(crate) struct ActionEntry {
    pub(crate) handler: ActionFn,
    pub(crate) namespace: String,
    pub(crate) state_path: Vec<String>,
}

/// A getter with the context it is computed in.
#[derive(Clone)]
pub(crate) struct GetterEntry {
    pub(crate) handler: GetterFn,
    pub(crate) namespace: String,
    pub(crate) state_path: Vec<String>,
}

/// Flat view of the registry keyed by qualified key.
///
/// Mutations and actions keep every handler registered under a key: modules that are
/// not namespaced share their parent's keys and all matching handlers run. A getter key
/// keeps its first registration.
#[derive(Default)]
pub(crate) struct Index {
    pub(crate) mutations: HashMap<String, Vec<MutationEntry>>,
    pub(crate) actions: HashMap<String, Vec<ActionEntry>>,
    pub(crate) getters: HashMap<String, GetterEntry>,
}

impl Index {
    pub(crate) fn build(root: &ModuleNode) -> Self {
        let mut index = Self::default();
        index.collect(root, "", &mut Vec::new());
        tracing::debug!(
            mutations = index.mutations.len(),
            actions = index.actions.len(),
            getters = index.getters.len(),
            "Rebuilt handler index"
        );
        index
    }

    fn collect(&mut self, node: &ModuleNode, namespace: &str, path: &mut Vec<String>) {
        for (name, handler) in &node.mutations {
            self.mutations
                .entry(qualify(name, namespace))
                .or_default()
                .push(MutationEntry {
                    handler: handler.clone(),
                    state_path: path.clone(),
                });
        }

        for (name, handler) in &node.actions {
            self.actions
                .entry(qualify(name, namespace))
                .or_default()
                .push(ActionEntry {
                    handler: handler.clone(),
                    namespace: namespace.to_string(),
                    state_path: path.clone(),
                });
        }

        for (name, handler) in &node.getters {
            let key = qualify(name, namespace);
            if self.getters.contains_key(&key) {
                tracing::error!(key = %key, "Duplicate getter key, keeping the first registration");
                continue;
            }
            self.getters.insert(
                key,
                GetterEntry {
                    handler: handler.clone(),
                    namespace: namespace.to_string(),
                    state_path: path.clone(),
                },
            );
        }

        for (name, child) in &node.children {
            let child_ns = child_namespace(namespace, name, child.namespaced);
            path.push(name.clone());
            self.collect(child, &child_ns, path);
            path.pop();
        }
    }

    /// Compute the getter registered under `key` against `root`.
    pub(crate) fn evaluate_getter(&self, root: &Payload, key: &str) -> Result<Payload, StoreError> {
        let entry = self
            .getters
            .get(key)
            .ok_or_else(|| StoreError::UnknownGetter(key.to_string()))?;
        let local = resolve_state(&entry.state_path, root)?;
        let lookup = IndexLookup { index: self, root };
        let context = GetterContext::new(local, root, &entry.namespace, &lookup);
        (entry.handler)(&context)
    }
}

struct IndexLookup<'a> {
    index: &'a Index,
    root: &'a Payload,
}

impl GetterLookup for IndexLookup<'_> {
    fn lookup(&self, key: &str) -> Result<Payload, StoreError> {
        self.index.evaluate_getter(self.root, key)
    }
}

/// Initial state for `config`, with every child module's state nested under its name.
///
/// # Errors
///
/// Returns [`StoreError::StateNotFound`] when a module with children has non-object
/// state.
pub(crate) fn initial_state_tree(
    config: &ModuleConfig,
    path: &[&str],
) -> Result<Payload, StoreError> {
    let mut state = config.initial_state();
    for (name, child) in config.modules() {
        let mut child_path = path.to_vec();
        child_path.push(name.as_str());
        let child_state = initial_state_tree(child, &child_path)?;

        let object = state.as_object_mut().ok_or_else(|| StoreError::StateNotFound {
            path: join_path(&child_path),
            segment: name.clone(),
        })?;
        if object.contains_key(name) {
            tracing::warn!(
                path = %join_path(&child_path),
                "State field is overridden by a module of the same name"
            );
        }
        object.insert(name.clone(), child_state);
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    fn noop(_: &mut Payload, _: Option<&Payload>) -> Result<(), StoreError> {
        Ok(())
    }

    fn tree() -> ModuleConfig {
        ModuleConfig::new()
            .state(json!({ "title": "root" }))
            .mutation("reset", noop)
            .module(
                "cart",
                ModuleConfig::new()
                    .namespaced(true)
                    .state(json!({ "items": [] }))
                    .mutation("add", noop)
                    .module("meta", ModuleConfig::new().mutation("touch", noop)),
            )
            .module("ui", ModuleConfig::new().mutation("reset", noop))
    }

    #[test]
    fn test_index_qualifies_keys() {
        let index = Index::build(&ModuleNode::from_config(&tree()));

        assert!(index.mutations.contains_key("cart/add"));
        // `meta` is not namespaced, so it shares `cart`'s namespace
        assert!(index.mutations.contains_key("cart/touch"));
        assert_eq!(index.mutations["cart/touch"][0].state_path, vec!["cart", "meta"]);
    }

    #[test]
    fn test_colliding_mutations_are_all_kept() {
        let index = Index::build(&ModuleNode::from_config(&tree()));
        assert_eq!(index.mutations["reset"].len(), 2);
    }

    #[test]
    fn test_initial_state_nests_modules() {
        let state = initial_state_tree(&tree(), &[]).unwrap();
        assert_eq!(
            state,
            json!({
                "title": "root",
                "cart": { "items": [], "meta": {} },
                "ui": {}
            })
        );
    }

    #[test]
    fn test_node_lookup_by_path() {
        let mut root = ModuleNode::from_config(&tree());
        assert!(root.get_mut(&["cart", "meta"]).is_some());
        assert!(root.get_mut(&["cart", "missing"]).is_none());
        assert!(root.get_mut(&[]).is_some());
    }
}
