//! The four profile axes and the selectors that fix them for one build.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// A classification axis. Each axis contributes one configuration per build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Runtime,
    Topology,
    Security,
    Iam,
}

impl Axis {
    /// Axes in installation order.
    pub const INSTALL_ORDER: [Axis; 4] = [Axis::Runtime, Axis::Topology, Axis::Security, Axis::Iam];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::Runtime => "Runtime",
            Axis::Topology => "Topology",
            Axis::Security => "Security",
            Axis::Iam => "IAM",
        })
    }
}

/// Shape of the deployed system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// One application node behind a load balancer.
    SingleNode,
    /// A load-balanced, scalable application service.
    Service,
    /// Static content served from a bucket, optionally through a CDN.
    StaticSite,
}

/// Compute substrate the application runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    /// Virtual machine instances in an auto-scaling group.
    Instance,
    /// Serverless containers managed by a service.
    Container,
}

/// Security posture of the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityProfile {
    Dev,
    Staging,
    Production,
}

/// Breadth of granted permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IamProfile {
    Minimal,
    Standard,
    Extended,
}

impl Topology {
    pub const ALL: [Topology; 3] = [Topology::SingleNode, Topology::Service, Topology::StaticSite];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::SingleNode => "single-node",
            Topology::Service => "service",
            Topology::StaticSite => "static-site",
        }
    }

    /// Legacy one-field values that fix both topology and runtime.
    pub fn from_legacy(value: &str) -> Option<(Topology, Runtime)> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jenkins-fargate" => Some((Topology::Service, Runtime::Container)),
            "jenkins-ec2" => Some((Topology::SingleNode, Runtime::Instance)),
            "cf-alb-s3" => Some((Topology::StaticSite, Runtime::Instance)),
            "cf-alb-proxy" => Some((Topology::Service, Runtime::Instance)),
            _ => None,
        }
    }
}

impl Runtime {
    pub const ALL: [Runtime; 2] = [Runtime::Instance, Runtime::Container];

    pub fn as_str(&self) -> &'static str {
        match self {
            Runtime::Instance => "instance",
            Runtime::Container => "container",
        }
    }
}

impl SecurityProfile {
    pub const ALL: [SecurityProfile; 3] = [
        SecurityProfile::Dev,
        SecurityProfile::Staging,
        SecurityProfile::Production,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityProfile::Dev => "dev",
            SecurityProfile::Staging => "staging",
            SecurityProfile::Production => "production",
        }
    }
}

impl IamProfile {
    pub const ALL: [IamProfile; 3] = [IamProfile::Minimal, IamProfile::Standard, IamProfile::Extended];

    pub fn as_str(&self) -> &'static str {
        match self {
            IamProfile::Minimal => "minimal",
            IamProfile::Standard => "standard",
            IamProfile::Extended => "extended",
        }
    }

    /// The permission profile that fits a security posture by default.
    ///
    /// Production gets least privilege, staging the balanced set, dev the
    /// broad debugging set.
    pub fn recommended_for(security: SecurityProfile) -> IamProfile {
        match security {
            SecurityProfile::Production => IamProfile::Minimal,
            SecurityProfile::Staging => IamProfile::Standard,
            SecurityProfile::Dev => IamProfile::Extended,
        }
    }

    /// Check whether this permission profile may be used under `security`.
    pub fn is_permitted_under(&self, security: SecurityProfile) -> bool {
        match security {
            SecurityProfile::Production => matches!(self, IamProfile::Minimal | IamProfile::Standard),
            SecurityProfile::Staging => matches!(self, IamProfile::Standard | IamProfile::Extended),
            SecurityProfile::Dev => true,
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SecurityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for IamProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn unknown(axis: Axis, value: &str) -> ConfigurationError {
    ConfigurationError::UnknownSelector {
        axis,
        value: value.to_string(),
    }
}

impl FromStr for Topology {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single-node" | "jenkins-single-node" => Ok(Topology::SingleNode),
            "service" | "jenkins-service" => Ok(Topology::Service),
            "static-site" | "s3-website" => Ok(Topology::StaticSite),
            _ => Err(unknown(Axis::Topology, s)),
        }
    }
}

impl FromStr for Runtime {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instance" | "ec2" => Ok(Runtime::Instance),
            "container" | "fargate" => Ok(Runtime::Container),
            _ => Err(unknown(Axis::Runtime, s)),
        }
    }
}

impl FromStr for SecurityProfile {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(SecurityProfile::Dev),
            "staging" | "stage" => Ok(SecurityProfile::Staging),
            "production" | "prod" => Ok(SecurityProfile::Production),
            _ => Err(unknown(Axis::Security, s)),
        }
    }
}

impl FromStr for IamProfile {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(IamProfile::Minimal),
            "standard" => Ok(IamProfile::Standard),
            "extended" => Ok(IamProfile::Extended),
            _ => Err(unknown(Axis::Iam, s)),
        }
    }
}

/// The four selectors fixed for the lifetime of one build root.
///
/// # Example
///
/// ```rust
/// use forgewire::{IamProfile, Runtime, SecurityProfile, Selectors, Topology};
///
/// let selectors = Selectors::recommended(
///     Topology::Service,
///     Runtime::Container,
///     SecurityProfile::Production,
/// );
/// assert_eq!(selectors.iam_profile, IamProfile::Minimal);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selectors {
    pub topology: Topology,
    pub runtime: Runtime,
    pub security: SecurityProfile,
    pub iam_profile: IamProfile,
}

impl Selectors {
    /// Create selectors from explicit axis values.
    pub fn new(
        topology: Topology,
        runtime: Runtime,
        security: SecurityProfile,
        iam_profile: IamProfile,
    ) -> Self {
        Self {
            topology,
            runtime,
            security,
            iam_profile,
        }
    }

    /// Create selectors with the permission profile recommended for `security`.
    pub fn recommended(topology: Topology, runtime: Runtime, security: SecurityProfile) -> Self {
        Self::new(topology, runtime, security, IamProfile::recommended_for(security))
    }

    /// Replace the permission profile.
    pub fn with_iam_profile(mut self, iam_profile: IamProfile) -> Self {
        self.iam_profile = iam_profile;
        self
    }

    /// The selector value for one axis.
    pub fn value(&self, axis: Axis) -> &'static str {
        match axis {
            Axis::Runtime => self.runtime.as_str(),
            Axis::Topology => self.topology.as_str(),
            Axis::Security => self.security.as_str(),
            Axis::Iam => self.iam_profile.as_str(),
        }
    }

    /// The first axis, in installation order, on which two selector sets differ.
    pub fn first_difference(&self, other: &Selectors) -> Option<Axis> {
        Axis::INSTALL_ORDER
            .into_iter()
            .find(|axis| self.value(*axis) != other.value(*axis))
    }
}

impl fmt::Display for Selectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "topology={} runtime={} security={} iam={}",
            self.topology, self.runtime, self.security, self.iam_profile
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_matrix() {
        use IamProfile::*;
        use SecurityProfile::*;

        assert!(Extended.is_permitted_under(Dev));
        assert!(Standard.is_permitted_under(Staging));
        assert!(Minimal.is_permitted_under(Production));
        assert!(!Extended.is_permitted_under(Production));
        assert!(!Minimal.is_permitted_under(Staging));
    }

    #[test]
    fn test_recommendation_is_always_permitted() {
        for security in SecurityProfile::ALL {
            let iam = IamProfile::recommended_for(security);
            assert!(
                iam.is_permitted_under(security),
                "{iam} recommended for {security} but not permitted"
            );
        }
    }

    #[test]
    fn test_full_matrix() {
        let expected = [
            (SecurityProfile::Dev, [true, true, true]),
            (SecurityProfile::Staging, [false, true, true]),
            (SecurityProfile::Production, [true, true, false]),
        ];
        for (security, row) in expected {
            for (iam, allowed) in IamProfile::ALL.into_iter().zip(row) {
                assert_eq!(iam.is_permitted_under(security), allowed, "({security}, {iam})");
            }
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("ec2".parse::<Runtime>().unwrap(), Runtime::Instance);
        assert_eq!("Fargate".parse::<Runtime>().unwrap(), Runtime::Container);
        assert_eq!("s3-website".parse::<Topology>().unwrap(), Topology::StaticSite);
        assert_eq!("prod".parse::<SecurityProfile>().unwrap(), SecurityProfile::Production);
        assert_eq!(" standard ".parse::<IamProfile>().unwrap(), IamProfile::Standard);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "mainframe".parse::<Runtime>().unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownSelector {
                axis: Axis::Runtime,
                value: "mainframe".to_string()
            }
        );
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for topology in Topology::ALL {
            assert_eq!(topology.to_string().parse::<Topology>().unwrap(), topology);
        }
    }

    #[test]
    fn test_legacy_combos() {
        assert_eq!(
            Topology::from_legacy("jenkins-fargate"),
            Some((Topology::Service, Runtime::Container))
        );
        assert_eq!(
            Topology::from_legacy("jenkins-ec2"),
            Some((Topology::SingleNode, Runtime::Instance))
        );
        assert_eq!(Topology::from_legacy("service"), None);
    }

    #[test]
    fn test_first_difference() {
        let base = Selectors::recommended(Topology::Service, Runtime::Container, SecurityProfile::Dev);
        assert_eq!(base.first_difference(&base), None);

        let other = base.with_iam_profile(IamProfile::Minimal);
        assert_eq!(base.first_difference(&other), Some(Axis::Iam));

        let other = Selectors {
            runtime: Runtime::Instance,
            security: SecurityProfile::Staging,
            ..base
        };
        assert_eq!(base.first_difference(&other), Some(Axis::Runtime));
    }
}
