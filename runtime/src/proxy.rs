//! Named collections of proxies.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// The proxies built for one module's getters, mutations or actions, by local name.
#[derive(Clone)]
pub struct ProxySet<P> {
    namespace: String,
    entries: BTreeMap<String, P>,
}

impl<P> ProxySet<P> {
    pub(crate) const fn new(namespace: String, entries: BTreeMap<String, P>) -> Self {
        Self { namespace, entries }
    }

    /// Proxy for `name`, if configured.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&P> {
        self.entries.get(name)
    }

    /// Whether `name` is configured.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Configured names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(name, proxy)` pairs in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, P> {
        self.entries.iter()
    }

    /// Namespace shared by every proxy in the set.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of proxies
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a, P> IntoIterator for &'a ProxySet<P> {
    type Item = (&'a String, &'a P);
    type IntoIter = btree_map::Iter<'a, String, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<P: fmt::Debug> fmt::Debug for ProxySet<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySet")
            .field("namespace", &self.namespace)
            .field("entries", &self.entries.values().collect::<Vec<_>>())
            .finish()
    }
}
