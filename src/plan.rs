//! The ledger of side effects performed by wiring.
//!
//! Wiring never touches real infrastructure. It records `Action`s, and a
//! caller materializes the plan once the build is accepted.

use std::cell::RefCell;
use std::fmt;

use crate::handle::Handle;
use crate::options::HealthCheck;

/// Traffic source of a security group rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Peer {
    AnyIpv4,
    Cidr(String),
    Group(Handle),
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::AnyIpv4 => f.write_str("0.0.0.0/0"),
            Peer::Cidr(cidr) => f.write_str(cidr),
            Peer::Group(group) => write!(f, "{group}"),
        }
    }
}

/// Which packets flow logs capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficType {
    Accept,
    Reject,
    All,
}

/// One permission statement of a role policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    pub sid: String,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

impl Statement {
    pub fn new(sid: impl Into<String>, actions: &[&str], resources: &[&str]) -> Self {
        Self {
            sid: sid.into(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
            resources: resources.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// A side effect recorded by wiring.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Register compute behind a target group.
    AttachTarget { target_group: Handle, target: Handle },
    /// Allow inbound tcp traffic into a security group.
    Ingress {
        group: Handle,
        peer: Peer,
        port: u16,
        description: String,
    },
    /// Add a listener to a load balancer.
    Listener {
        load_balancer: Handle,
        listener: Handle,
        port: u16,
        certificate: Option<Handle>,
    },
    /// Make a listener forward to a target group.
    Forward { listener: Handle, target_group: Handle },
    /// Make a listener redirect to HTTPS on `port`.
    Redirect { listener: Handle, port: u16 },
    /// Request a DNS-validated certificate.
    Certificate {
        certificate: Handle,
        domain: String,
        zone: Handle,
    },
    /// Create a target group for a service.
    TargetGroup {
        target_group: Handle,
        network: Handle,
        service: Handle,
        port: u16,
        health_check: HealthCheck,
    },
    /// Publish an alias record for a target.
    DnsAlias {
        zone: Handle,
        record: String,
        target: Handle,
        ipv6: bool,
    },
    /// Create or look up a hosted zone for a domain.
    HostedZone {
        zone: Handle,
        domain: String,
        lookup: bool,
    },
    /// Create a role assumed by `principal`.
    Role {
        role: Handle,
        principal: String,
        managed_policies: Vec<String>,
        statements: Vec<Statement>,
    },
    /// Track CPU utilization on a scalable target.
    Scaling {
        target: Handle,
        min: u32,
        max: u32,
        cpu_target: u32,
    },
    /// Create a static website bucket.
    Bucket {
        bucket: Handle,
        index_document: String,
        error_document: String,
    },
    /// Create a CDN distribution over an origin.
    Distribution {
        distribution: Handle,
        origin: Handle,
        certificate: Option<Handle>,
        domains: Vec<String>,
    },
    /// Capture network traffic logs.
    FlowLogs {
        flow_log: Handle,
        network: Handle,
        traffic: TrafficType,
        retention_days: u32,
    },
}

impl Action {
    /// Short variant label used in events and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Action::AttachTarget { .. } => "attach-target",
            Action::Ingress { .. } => "ingress",
            Action::Listener { .. } => "listener",
            Action::Forward { .. } => "forward",
            Action::Redirect { .. } => "redirect",
            Action::Certificate { .. } => "certificate",
            Action::TargetGroup { .. } => "target-group",
            Action::DnsAlias { .. } => "dns-alias",
            Action::HostedZone { .. } => "hosted-zone",
            Action::Role { .. } => "role",
            Action::Scaling { .. } => "scaling",
            Action::Bucket { .. } => "bucket",
            Action::Distribution { .. } => "distribution",
            Action::FlowLogs { .. } => "flow-logs",
        }
    }
}

/// Ordered, de-duplicating list of actions.
#[derive(Debug, Default)]
pub struct Plan {
    actions: RefCell<Vec<Action>>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `action` unless an equal action is already recorded.
    ///
    /// Returns `true` if the action was new.
    pub fn record(&self, action: Action) -> bool {
        let mut actions = self.actions.borrow_mut();
        if actions.contains(&action) {
            return false;
        }
        actions.push(action);
        true
    }

    /// Snapshot of every recorded action.
    pub fn actions(&self) -> Vec<Action> {
        self.actions.borrow().clone()
    }

    /// Recorded actions matching a predicate.
    pub fn filter(&self, predicate: impl Fn(&Action) -> bool) -> Vec<Action> {
        self.actions
            .borrow()
            .iter()
            .filter(|a| predicate(a))
            .cloned()
            .collect()
    }

    /// Ingress rules recorded for one security group.
    pub fn ingress_for(&self, group: &Handle) -> Vec<(Peer, u16)> {
        self.actions
            .borrow()
            .iter()
            .filter_map(|a| match a {
                Action::Ingress {
                    group: g, peer, port, ..
                } if g == group => Some((peer.clone(), *port)),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded actions.
    pub fn len(&self) -> usize {
        self.actions.borrow().len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.actions.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ResourceKind;

    fn sg(id: &str) -> Handle {
        Handle::new(ResourceKind::SecurityGroup, id)
    }

    #[test]
    fn test_record_deduplicates() {
        let plan = Plan::new();
        let ingress = Action::Ingress {
            group: sg("app"),
            peer: Peer::Group(sg("lb")),
            port: 8080,
            description: "lb to app".to_string(),
        };

        assert!(plan.record(ingress.clone()));
        assert!(!plan.record(ingress));
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_ingress_for() {
        let plan = Plan::new();
        plan.record(Action::Ingress {
            group: sg("app"),
            peer: Peer::AnyIpv4,
            port: 22,
            description: "ssh".to_string(),
        });
        plan.record(Action::Ingress {
            group: sg("lb"),
            peer: Peer::AnyIpv4,
            port: 443,
            description: "https".to_string(),
        });

        assert_eq!(plan.ingress_for(&sg("app")), vec![(Peer::AnyIpv4, 22)]);
        assert_eq!(plan.filter(|a| a.label() == "ingress").len(), 2);
    }

    #[test]
    fn test_peer_display() {
        assert_eq!(Peer::AnyIpv4.to_string(), "0.0.0.0/0");
        assert_eq!(Peer::Group(sg("lb")).to_string(), "security-group/lb");
    }
}
