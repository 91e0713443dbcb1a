//! Unsubscribe handles.
//!
//! Every subscription API on the engine and on the proxies returns a [`Subscription`].
//! Calling [`Subscription::unsubscribe`] stops future delivery. The cancel action runs
//! at most once no matter how many times (or from how many clones) it is called.
//!
//! Dropping a handle does **not** unsubscribe; the registering caller owns the
//! subscription's lifetime.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

type Cancel = Box<dyn FnOnce() + Send>;

/// Idempotent handle that removes a listener from the engine.
#[derive(Clone)]
pub struct Subscription {
    cancel: Arc<Mutex<Option<Cancel>>>,
}

impl Subscription {
    /// Wrap a cancel action.
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Arc::new(Mutex::new(Some(Box::new(cancel)))),
        }
    }

    /// A handle that is already inactive.
    #[must_use]
    pub fn inactive() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(None)),
        }
    }

    /// Stop delivery. Safe to call repeatedly.
    pub fn unsubscribe(&self) {
        // Take the action out before running it so a cancel that re-enters
        // `unsubscribe` does not deadlock.
        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Whether the listener is still registered through this handle.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_unsubscribe_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(subscription.is_active());
        subscription.unsubscribe();
        subscription.unsubscribe();
        subscription.clone().unsubscribe();

        assert!(!subscription.is_active());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_inactive_handle() {
        let subscription = Subscription::inactive();
        assert!(!subscription.is_active());
        subscription.unsubscribe();
    }
}
