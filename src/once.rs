//! Idempotent, key-addressed action scheduling.

use std::cell::RefCell;
use std::collections::HashSet;

use tracing::{debug, trace};

/// Per-context registry guaranteeing a named stage runs at most once.
///
/// # Example
///
/// ```rust
/// use forgewire::OnceScheduler;
///
/// let scheduler = OnceScheduler::new();
/// assert_eq!(scheduler.once("stage", || 42), Some(42));
/// assert_eq!(scheduler.once("stage", || 43), None);
/// ```
#[derive(Debug, Default)]
pub struct OnceScheduler {
    fired: RefCell<HashSet<String>>,
    ordered: RefCell<Vec<String>>,
}

impl OnceScheduler {
    /// Create a scheduler with no fired keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` the first time `key` is seen.
    ///
    /// Returns `Some` with the action's result when it ran, `None` when the
    /// key had already fired.
    pub fn once<R>(&self, key: impl Into<String>, action: impl FnOnce() -> R) -> Option<R> {
        let key = key.into();
        let fresh = self.fired.borrow_mut().insert(key.clone());
        if !fresh {
            trace!("once: `{}` already fired, skipping", key);
            return None;
        }

        debug!("once: firing `{}`", key);
        self.ordered.borrow_mut().push(key);
        Some(action())
    }

    /// Check if `key` has fired.
    pub fn has_fired(&self, key: &str) -> bool {
        self.fired.borrow().contains(key)
    }

    /// Fired keys in firing order.
    pub fn keys(&self) -> Vec<String> {
        self.ordered.borrow().clone()
    }

    /// Number of fired keys.
    pub fn len(&self) -> usize {
        self.ordered.borrow().len()
    }

    /// Check if nothing has fired yet.
    pub fn is_empty(&self) -> bool {
        self.ordered.borrow().is_empty()
    }
}
