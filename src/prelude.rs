//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! from Forgewire for convenient glob imports.
//!
//! # Example
//!
//! ```rust
//! use forgewire::prelude::*;
//! ```

// Build entry points
pub use crate::context::{Context, ContextRef, Phase};
pub use crate::registry::ContextRegistry;

// Selectors and options
pub use crate::options::{AuthMode, HealthCheck, Options};
pub use crate::profile::{Axis, IamProfile, Runtime, SecurityProfile, Selectors, Topology};

// Slots and wiring
pub use crate::handle::{Handle, ResourceKind};
pub use crate::join::{when_all, when_all4, when_all5, when_both};
pub use crate::plan::{Action, Peer, Plan};
pub use crate::slot::Slot;

// Rules
pub use crate::configuration::Configuration;
pub use crate::rules::{check, forbid, require, when, Rule};
pub use crate::validate::ValidationReport;

// Streams
pub use crate::stream::{BuildEvent, EventStream, EventStreamExt};

// Errors
pub use crate::error::{ConfigurationError, ForgeError, ForgeResult};
