//! Aggregate validation run once at build finalization.

use std::cell::RefCell;
use std::fmt;

use crate::context::Context;
use crate::rules::Rule;

/// One rule failure, tagged with the configuration that contributed the rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub source: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.source, self.message)
    }
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    /// Check if no rule reported anything.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// All violations in rule-registration order.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Violation messages without their source tags.
    pub fn messages(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.message.as_str()).collect()
    }

    /// Check if some violation has exactly this message.
    pub fn contains(&self, message: &str) -> bool {
        self.violations.iter().any(|v| v.message == message)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed with {} violation(s):", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "\n  - {violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

/// Collects rules from every installed axis and runs them together.
#[derive(Debug, Default)]
pub struct Validator {
    rules: RefCell<Vec<(String, Rule)>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add rules contributed by `source`.
    pub fn register(&self, source: &str, rules: Vec<Rule>) {
        let mut registered = self.rules.borrow_mut();
        registered.extend(rules.into_iter().map(|rule| (source.to_string(), rule)));
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.borrow().len()
    }

    /// Check if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.borrow().is_empty()
    }

    /// Run every rule; one failure never hides another.
    pub fn run(&self, ctx: &Context) -> ValidationReport {
        let violations = self
            .rules
            .borrow()
            .iter()
            .flat_map(|(source, rule)| {
                rule.check(ctx).into_iter().map(move |message| Violation {
                    source: source.clone(),
                    message,
                })
            })
            .collect();
        ValidationReport { violations }
    }
}
