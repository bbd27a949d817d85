//! Error types for Forgewire.

use thiserror::Error;

use crate::profile::Axis;
use crate::validate::ValidationReport;

/// Root error type for Forgewire operations.
#[derive(Error, Debug, Clone)]
pub enum ForgeError {
    /// Caller bug detected immediately (inconsistent start, missing start, bad options)
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// One or more rules reported violations at finalization
    #[error(transparent)]
    Validation(#[from] ValidationReport),

    /// A slot was dereferenced before any collaborator populated it
    #[error("Missing dependency: slot `{slot}` has no value")]
    MissingDependency {
        /// Diagnostic name of the empty slot
        slot: &'static str,
    },
}

impl ForgeError {
    /// Returns the validation report if this error is a rule failure.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            ForgeError::Validation(report) => Some(report),
            _ => None,
        }
    }

    /// Check if this error is a [`ConfigurationError`].
    pub fn is_configuration(&self) -> bool {
        matches!(self, ForgeError::Configuration(_))
    }
}

/// Errors raised immediately when a build is set up inconsistently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A context already exists for the root with a different selector
    #[error(
        "context for root `{root}` already started with {axis}={started}; cannot restart with {axis}={requested}"
    )]
    SelectorMismatch {
        root: String,
        axis: Axis,
        started: String,
        requested: String,
    },

    /// `of()` called for a root that was never started
    #[error("no context started for root `{0}`; call start() first")]
    NotStarted(String),

    /// An axis value could not be parsed
    #[error("unknown {axis} selector: {value}")]
    UnknownSelector { axis: Axis, value: String },

    /// An option value is out of range or malformed
    #[error("invalid option `{key}`: {reason}")]
    InvalidOption { key: &'static str, reason: String },

    /// `finalize()` called more than once
    #[error("context for root `{0}` has already been finalized")]
    AlreadyFinalized(String),
}

/// Result type alias for general Forgewire operations.
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Result type alias for configuration checks.
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;
