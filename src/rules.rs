//! Validation rules and the constructors configurations build them with.

use std::fmt;

use crate::context::Context;
use crate::slot::Slot;

/// A stateless predicate over the context.
///
/// An empty result means the rule is satisfied; otherwise each string is one
/// human-readable violation.
pub struct Rule {
    check: Box<dyn Fn(&Context) -> Vec<String>>,
}

impl Rule {
    /// Wrap a check function.
    pub fn new(check: impl Fn(&Context) -> Vec<String> + 'static) -> Self {
        Self {
            check: Box::new(check),
        }
    }

    /// A rule that never reports anything.
    pub fn pass() -> Self {
        Self::new(|_| Vec::new())
    }

    /// Evaluate the rule.
    pub fn check(&self, ctx: &Context) -> Vec<String> {
        (self.check)(ctx)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Rule")
    }
}

/// Violation `required: <name>` when the slot is empty at validation time.
pub fn require<T, F>(name: &'static str, slot: F) -> Rule
where
    T: Clone + 'static,
    F: Fn(&Context) -> &Slot<T> + 'static,
{
    Rule::new(move |ctx| {
        if slot(ctx).is_set() {
            Vec::new()
        } else {
            vec![format!("required: {name}")]
        }
    })
}

/// Violation `forbidden: <name>` when the slot holds a value at validation time.
pub fn forbid<T, F>(name: &'static str, slot: F) -> Rule
where
    T: Clone + 'static,
    F: Fn(&Context) -> &Slot<T> + 'static,
{
    Rule::new(move |ctx| {
        if slot(ctx).is_set() {
            vec![format!("forbidden: {name}")]
        } else {
            Vec::new()
        }
    })
}

/// Gate `rule` on a condition known when the axis is installed.
pub fn when(cond: bool, rule: Rule) -> Rule {
    if cond {
        rule
    } else {
        Rule::pass()
    }
}

/// Violation `message` when `predicate` does not hold.
pub fn check(message: impl Into<String>, predicate: impl Fn(&Context) -> bool + 'static) -> Rule {
    let message = message.into();
    Rule::new(move |ctx| {
        if predicate(ctx) {
            Vec::new()
        } else {
            vec![message.clone()]
        }
    })
}
