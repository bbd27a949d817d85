//! Per-axis configurations.
//!
//! Each axis value has one read-only configuration contributing validation
//! rules and a wiring action. Selection is an exhaustive `match`, so adding an
//! axis value without a configuration does not compile.

mod iam;
mod runtime;
mod security;
mod topology;

use std::fmt::Debug;

use crate::context::Context;
use crate::error::ForgeResult;
use crate::handle::{Handle, ResourceKind};
use crate::profile::{Axis, IamProfile, Runtime, SecurityProfile, Selectors, Topology};
use crate::rules::Rule;

pub use iam::{missing_permissions, required_permissions, IamConfiguration};
pub use runtime::{ContainerRuntime, InstanceRuntime};
pub use security::{SecurityConfiguration, SecurityPosture};
pub use topology::{ServiceTopology, SingleNodeTopology, StaticSiteTopology};

/// Rules and wiring contributed by one axis value.
pub trait Configuration: Debug + Sync {
    /// Stable identifier, e.g. `runtime:container`.
    fn id(&self) -> &'static str;

    /// Rules checked once at finalization.
    fn rules(&self, ctx: &Context) -> Vec<Rule>;

    /// Register joins and record immediate side effects.
    fn wire(&self, ctx: &Context) -> ForgeResult<()>;
}

pub fn runtime_configuration(runtime: Runtime) -> &'static dyn Configuration {
    match runtime {
        Runtime::Instance => &InstanceRuntime,
        Runtime::Container => &ContainerRuntime,
    }
}

pub fn topology_configuration(topology: Topology) -> &'static dyn Configuration {
    match topology {
        Topology::SingleNode => &SingleNodeTopology,
        Topology::Service => &ServiceTopology,
        Topology::StaticSite => &StaticSiteTopology,
    }
}

pub fn security_configuration(security: SecurityProfile) -> &'static dyn Configuration {
    match security {
        SecurityProfile::Dev => &security::DEV,
        SecurityProfile::Staging => &security::STAGING,
        SecurityProfile::Production => &security::PRODUCTION,
    }
}

pub fn iam_configuration(iam_profile: IamProfile) -> &'static dyn Configuration {
    match iam_profile {
        IamProfile::Minimal => &iam::MINIMAL,
        IamProfile::Standard => &iam::STANDARD,
        IamProfile::Extended => &iam::EXTENDED,
    }
}

/// The configuration selected for `axis`.
pub fn configuration_for(axis: Axis, selectors: &Selectors) -> &'static dyn Configuration {
    match axis {
        Axis::Runtime => runtime_configuration(selectors.runtime),
        Axis::Topology => topology_configuration(selectors.topology),
        Axis::Security => security_configuration(selectors.security),
        Axis::Iam => iam_configuration(selectors.iam_profile),
    }
}

/// Handle for a resource created by wiring, stable per root and name.
pub(crate) fn mint(ctx: &Context, kind: ResourceKind, name: &str) -> Handle {
    Handle::new(kind, format!("{}-{}", ctx.root(), name))
}
