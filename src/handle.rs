//! Opaque resource handles exchanged through slots.

use std::fmt;
use std::sync::Arc;

/// The family a resource handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Network,
    LoadBalancer,
    SecurityGroup,
    TargetGroup,
    Listener,
    AutoScalingGroup,
    FileSystem,
    AccessPoint,
    LogGroup,
    HostedZone,
    Certificate,
    Service,
    TaskDefinition,
    Container,
    Bucket,
    Distribution,
    Role,
    FlowLog,
}

impl ResourceKind {
    /// Short lowercase label used in handle display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Network => "network",
            ResourceKind::LoadBalancer => "load-balancer",
            ResourceKind::SecurityGroup => "security-group",
            ResourceKind::TargetGroup => "target-group",
            ResourceKind::Listener => "listener",
            ResourceKind::AutoScalingGroup => "auto-scaling-group",
            ResourceKind::FileSystem => "file-system",
            ResourceKind::AccessPoint => "access-point",
            ResourceKind::LogGroup => "log-group",
            ResourceKind::HostedZone => "hosted-zone",
            ResourceKind::Certificate => "certificate",
            ResourceKind::Service => "service",
            ResourceKind::TaskDefinition => "task-definition",
            ResourceKind::Container => "container",
            ResourceKind::Bucket => "bucket",
            ResourceKind::Distribution => "distribution",
            ResourceKind::Role => "role",
            ResourceKind::FlowLog => "flow-log",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity-only token for a resource produced by a factory or by wiring.
///
/// The engine never looks inside a handle. Two handles are the same resource
/// when their kind and id match, so cloning is cheap and comparisons are the
/// only operation wiring relies on.
///
/// # Example
///
/// ```rust
/// use forgewire::{Handle, ResourceKind};
///
/// let sg = Handle::new(ResourceKind::SecurityGroup, "instance-sg");
/// assert_eq!(sg.kind(), ResourceKind::SecurityGroup);
/// assert_eq!(sg.to_string(), "security-group/instance-sg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    kind: ResourceKind,
    id: Arc<str>,
}

impl Handle {
    /// Create a handle for a resource of the given kind.
    pub fn new(kind: ResourceKind, id: impl AsRef<str>) -> Self {
        Self {
            kind,
            id: Arc::from(id.as_ref()),
        }
    }

    /// The resource family.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The resource identifier, unique within its kind.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_identity() {
        let a = Handle::new(ResourceKind::Listener, "https");
        let b = a.clone();
        let c = Handle::new(ResourceKind::Certificate, "https");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.id(), "https");
    }
}
