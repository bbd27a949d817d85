//! Registry of build contexts.
//!
//! The `ContextRegistry` owns one [`Context`] per build root. It is an
//! explicit value: callers create it and thread it through, there is no
//! process-wide instance.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::context::Context;
use crate::error::{ConfigurationError, ForgeResult};
use crate::options::Options;
use crate::profile::Selectors;

/// One context per build root.
///
/// # Example
///
/// ```rust
/// use forgewire::{ContextRegistry, Options, Runtime, SecurityProfile, Selectors, Topology};
/// use std::rc::Rc;
///
/// let selectors = Selectors::recommended(Topology::Service, Runtime::Container, SecurityProfile::Dev);
///
/// let mut registry = ContextRegistry::new();
/// let first = registry.start("app", selectors, Options::new()).unwrap();
/// let again = registry.start("app", selectors, Options::new()).unwrap();
///
/// assert!(Rc::ptr_eq(&first, &again));
/// assert!(Rc::ptr_eq(&first, &registry.of("app").unwrap()));
/// ```
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: HashMap<String, Rc<Context>>,
    ordered: Vec<String>,
}

impl ContextRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the context for `root`, or return the existing one.
    ///
    /// A second start with equal selectors returns the same instance and
    /// ignores `options`. Any differing selector is a
    /// [`ConfigurationError::SelectorMismatch`] naming the first axis, in
    /// installation order, that differs.
    pub fn start(
        &mut self,
        root: &str,
        selectors: Selectors,
        options: Options,
    ) -> ForgeResult<Rc<Context>> {
        if let Some(existing) = self.contexts.get(root) {
            let started = existing.selectors();
            return match started.first_difference(&selectors) {
                None => {
                    debug!("Reusing context `{}`", root);
                    Ok(Rc::clone(existing))
                }
                Some(axis) => Err(ConfigurationError::SelectorMismatch {
                    root: root.to_string(),
                    axis,
                    started: started.value(axis).to_string(),
                    requested: selectors.value(axis).to_string(),
                }
                .into()),
            };
        }

        let ctx = Context::start(root, selectors, options)?;
        self.ordered.push(root.to_string());
        self.contexts.insert(root.to_string(), Rc::clone(&ctx));
        Ok(ctx)
    }

    /// The context started for `root`.
    pub fn of(&self, root: &str) -> ForgeResult<Rc<Context>> {
        self.contexts
            .get(root)
            .cloned()
            .ok_or_else(|| ConfigurationError::NotStarted(root.to_string()).into())
    }

    /// Check if a context was started for `root`.
    pub fn contains(&self, root: &str) -> bool {
        self.contexts.contains_key(root)
    }

    /// Drop the registry's reference to a root's context.
    pub fn remove(&mut self, root: &str) -> Option<Rc<Context>> {
        self.ordered.retain(|r| r != root);
        self.contexts.remove(root)
    }

    /// Started roots in start order.
    pub fn roots(&self) -> Vec<&str> {
        self.ordered.iter().map(|s| s.as_str()).collect()
    }

    /// Get the number of started contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Iterate over contexts in start order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Context>> {
        self.ordered
            .iter()
            .filter_map(move |root| self.contexts.get(root))
    }
}
