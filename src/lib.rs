//! # Forgewire
//!
//! **Forgewire** is the profile composition and dependency-wiring engine of
//! an infrastructure deployment toolkit.
//!
//! ## Overview
//!
//! A build is classified along four independent axes:
//! - **Topology**: single-node, service or static-site
//! - **Runtime**: virtual-machine instances or containers
//! - **Security**: dev, staging or production posture
//! - **IAM**: minimal, standard or extended permission profile
//!
//! Each axis value contributes validation rules and wiring to one shared
//! [`Context`]. Resource factories, which live outside this crate, publish
//! opaque [`Handle`]s into the context's [`Slot`]s in any order; join
//! combinators fire wiring as soon as every slot a step depends on holds a
//! value, and every side effect is recorded in the context's [`Plan`].
//!
//! ## Lifecycle
//!
//! ```text
//! start   - validate options, install Runtime, Topology, Security, IAM
//! open    - factories set slots; joins record actions
//! finalize - run every rule once; Accepted or Rejected
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use forgewire::prelude::*;
//!
//! let mut registry = ContextRegistry::new();
//! let ctx = registry
//!     .start(
//!         "jenkins",
//!         Selectors::recommended(Topology::Service, Runtime::Container, SecurityProfile::Dev),
//!         Options::new(),
//!     )
//!     .unwrap();
//!
//! // Factories publish what they built.
//! ctx.vpc.set(Handle::new(ResourceKind::Network, "vpc-1"));
//! ctx.alb.set(Handle::new(ResourceKind::LoadBalancer, "alb-1"));
//! ctx.alb_sg.set(Handle::new(ResourceKind::SecurityGroup, "sg-alb"));
//! ctx.http.set(Handle::new(ResourceKind::Listener, "http"));
//! ctx.service.set(Handle::new(ResourceKind::Service, "svc"));
//! ctx.container.set(Handle::new(ResourceKind::Container, "jenkins"));
//!
//! assert!(ctx.finalize().is_ok());
//! assert!(!ctx.plan().is_empty());
//! ```

pub mod configuration;
mod context;
mod error;
mod handle;
mod install;
mod join;
mod once;
mod options;
mod plan;
mod profile;
mod registry;
mod rules;
mod slot;
pub mod stream;
mod validate;

pub mod prelude;

pub use configuration::{Configuration, SecurityPosture};
pub use context::{Context, ContextRef, Phase};
pub use error::{ConfigurationError, ConfigurationResult, ForgeError, ForgeResult};
pub use handle::{Handle, ResourceKind};
pub use install::wiring_key;
pub use join::{when_all, when_all4, when_all5, when_both};
pub use once::OnceScheduler;
pub use options::{AuthMode, HealthCheck, Options};
pub use plan::{Action, Peer, Plan, Statement, TrafficType};
pub use profile::{Axis, IamProfile, Runtime, SecurityProfile, Selectors, Topology};
pub use registry::ContextRegistry;
pub use rules::{check, forbid, require, when, Rule};
pub use slot::Slot;
pub use stream::{create_stream, BuildEvent, EventSender, EventStream};
pub use validate::{ValidationReport, Validator, Violation};
