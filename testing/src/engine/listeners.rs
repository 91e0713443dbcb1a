//! Listener tables with stable ids.

use smallvec::SmallVec;
use std::sync::{Mutex, PoisonError};

/// Listeners in registration order, each tagged with an id for removal.
pub(crate) struct Listeners<T> {
    inner: Mutex<Table<T>>,
}

struct Table<T> {
    next_id: u64,
    entries: Vec<(u64, T)>,
}

impl<T: Clone> Listeners<T> {
    pub(crate) const fn new() -> Self {
        Self {
            inner: Mutex::new(Table {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }

    /// Append a listener and return its id.
    pub(crate) fn insert(&self, listener: T) -> u64 {
        let mut table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = table.next_id;
        table.next_id += 1;
        table.entries.push((id, listener));
        id
    }

    /// Remove the listener with `id`. Unknown ids are ignored.
    pub(crate) fn remove(&self, id: u64) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .retain(|(entry_id, _)| *entry_id != id);
    }

    /// Clone the current listeners out so they can run without the lock held.
    pub(crate) fn snapshot(&self) -> SmallVec<[T; 4]> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}
