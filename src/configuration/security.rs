//! Security posture configurations.
//!
//! The three profiles share one hardening routine; what differs is the
//! posture table and the network exposure.

use tracing::{debug, info};

use super::runtime::{app_ingress, APP_PORT, HTTPS_PORT};
use super::{mint, Configuration};
use crate::context::Context;
use crate::error::ForgeResult;
use crate::handle::{Handle, ResourceKind};
use crate::join::when_both;
use crate::plan::{Action, Peer, TrafficType};
use crate::profile::{Runtime, SecurityProfile, Topology};
use crate::rules::{require, when, Rule};

const SSH_PORT: u16 = 22;
const HTTP_PORT: u16 = 80;
const NFS_PORT: u16 = 2049;

/// Settings implied by a security profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPosture {
    pub profile: SecurityProfile,
    pub log_retention_days: u32,
    pub retain_logs: bool,
    pub flow_logs: bool,
    pub flow_log_traffic: TrafficType,
    pub flow_log_retention_days: u32,
    pub security_monitoring: bool,
    pub cloudtrail: bool,
    pub guardduty: bool,
    pub config_rules: bool,
    pub ebs_encryption: bool,
    pub efs_encryption_in_transit: bool,
    pub efs_encryption_at_rest: bool,
    pub s3_encryption: bool,
    pub vpc_endpoints: bool,
    pub nat_gateway: bool,
    pub waf: bool,
    pub cloudfront: bool,
    pub automated_backups: bool,
    pub backup_retention_days: u32,
    pub cross_region_backup: bool,
    pub alb_access_logs: bool,
    pub alb_access_log_retention_days: u32,
    pub multi_az: bool,
    pub auto_scaling: bool,
    pub min_instances: u32,
    pub max_instances: u32,
}

impl SecurityPosture {
    pub fn for_profile(profile: SecurityProfile) -> Self {
        match profile {
            SecurityProfile::Dev => Self {
                profile,
                log_retention_days: 7,
                retain_logs: false,
                flow_logs: false,
                flow_log_traffic: TrafficType::Accept,
                flow_log_retention_days: 7,
                security_monitoring: false,
                cloudtrail: false,
                guardduty: false,
                config_rules: false,
                ebs_encryption: true,
                efs_encryption_in_transit: true,
                efs_encryption_at_rest: true,
                s3_encryption: true,
                vpc_endpoints: false,
                nat_gateway: false,
                waf: false,
                cloudfront: false,
                automated_backups: false,
                backup_retention_days: 7,
                cross_region_backup: false,
                alb_access_logs: false,
                alb_access_log_retention_days: 7,
                multi_az: false,
                auto_scaling: false,
                min_instances: 1,
                max_instances: 2,
            },
            SecurityProfile::Staging => Self {
                profile,
                log_retention_days: 30,
                retain_logs: true,
                flow_logs: true,
                flow_log_traffic: TrafficType::All,
                flow_log_retention_days: 30,
                security_monitoring: true,
                cloudtrail: true,
                guardduty: false,
                config_rules: true,
                ebs_encryption: true,
                efs_encryption_in_transit: true,
                efs_encryption_at_rest: true,
                s3_encryption: true,
                vpc_endpoints: true,
                nat_gateway: true,
                waf: true,
                cloudfront: false,
                automated_backups: true,
                backup_retention_days: 30,
                cross_region_backup: false,
                alb_access_logs: true,
                alb_access_log_retention_days: 30,
                multi_az: true,
                auto_scaling: true,
                min_instances: 1,
                max_instances: 5,
            },
            SecurityProfile::Production => Self {
                profile,
                log_retention_days: 731,
                retain_logs: true,
                flow_logs: true,
                flow_log_traffic: TrafficType::All,
                flow_log_retention_days: 731,
                security_monitoring: true,
                cloudtrail: true,
                guardduty: true,
                config_rules: true,
                ebs_encryption: true,
                efs_encryption_in_transit: true,
                efs_encryption_at_rest: true,
                s3_encryption: true,
                vpc_endpoints: true,
                nat_gateway: true,
                waf: true,
                cloudfront: true,
                automated_backups: true,
                backup_retention_days: 90,
                cross_region_backup: true,
                alb_access_logs: true,
                alb_access_log_retention_days: 731,
                multi_az: true,
                auto_scaling: true,
                min_instances: 2,
                max_instances: 20,
            },
        }
    }
}

/// Network exposure of a profile.
struct Exposure {
    ssh_from: Peer,
    /// `None` restricts the application port to the load balancer group.
    app_from: Option<Peer>,
    lb_ports: &'static [u16],
}

impl Exposure {
    fn for_profile(profile: SecurityProfile) -> Self {
        match profile {
            SecurityProfile::Dev => Self {
                ssh_from: Peer::AnyIpv4,
                app_from: Some(Peer::AnyIpv4),
                lb_ports: &[HTTP_PORT, HTTPS_PORT],
            },
            SecurityProfile::Staging => Self {
                ssh_from: Peer::Cidr("10.0.0.0/16".to_string()),
                app_from: None,
                lb_ports: &[HTTP_PORT, HTTPS_PORT],
            },
            SecurityProfile::Production => Self {
                ssh_from: Peer::Cidr("10.0.1.0/24".to_string()),
                app_from: None,
                lb_ports: &[HTTPS_PORT],
            },
        }
    }
}

#[derive(Debug)]
pub struct SecurityConfiguration {
    profile: SecurityProfile,
}

pub(super) static DEV: SecurityConfiguration = SecurityConfiguration {
    profile: SecurityProfile::Dev,
};
pub(super) static STAGING: SecurityConfiguration = SecurityConfiguration {
    profile: SecurityProfile::Staging,
};
pub(super) static PRODUCTION: SecurityConfiguration = SecurityConfiguration {
    profile: SecurityProfile::Production,
};

impl Configuration for SecurityConfiguration {
    fn id(&self) -> &'static str {
        match self.profile {
            SecurityProfile::Dev => "security:dev",
            SecurityProfile::Staging => "security:staging",
            SecurityProfile::Production => "security:production",
        }
    }

    fn rules(&self, ctx: &Context) -> Vec<Rule> {
        let networked = ctx.topology() != Topology::StaticSite;
        let audited = self.profile != SecurityProfile::Dev;
        vec![
            when(networked, require("albSg", |c| &c.alb_sg)),
            when(networked && audited, require("efsSg", |c| &c.efs_sg)),
            when(networked && audited, require("flowLogs", |c| &c.flow_logs)),
        ]
    }

    fn wire(&self, ctx: &Context) -> ForgeResult<()> {
        info!("[{}] applying {} security profile", ctx.root(), self.profile);
        hosted_zone(ctx);
        harden(ctx, self.profile);
        if self.profile != SecurityProfile::Dev {
            flow_logs(ctx);
        }
        Ok(())
    }
}

/// Create or look up the hosted zone for the configured domain.
fn hosted_zone(ctx: &Context) {
    let Some(domain) = ctx.options().domain.as_deref().map(str::trim) else {
        return;
    };
    if domain.is_empty() || ctx.zone.is_set() {
        return;
    }

    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    let zone = mint(ctx, ResourceKind::HostedZone, &domain);
    ctx.record(Action::HostedZone {
        zone: zone.clone(),
        domain,
        lookup: !ctx.options().create_zone,
    });
    ctx.zone.set(zone);
}

fn ingress(ctx: &Context, group: Handle, peer: Peer, port: u16, description: &str) {
    ctx.record(Action::Ingress {
        group,
        peer,
        port,
        description: description.to_string(),
    });
}

fn harden(ctx: &Context, profile: SecurityProfile) {
    let runtime = ctx.runtime();

    if runtime == Runtime::Instance {
        let ssh_from = Exposure::for_profile(profile).ssh_from;
        let r = ctx.downgrade();
        when_both(&ctx.vpc, &ctx.instance_sg, move |_vpc, instance_sg| {
            r.with(|c| {
                ingress(c, instance_sg.clone(), ssh_from.clone(), SSH_PORT, "ssh");
                if let Some(peer) = Exposure::for_profile(profile).app_from {
                    ingress(c, instance_sg, peer, APP_PORT, "application from anywhere");
                }
                Ok(())
            })
        });

        let r = ctx.downgrade();
        when_both(&ctx.instance_sg, &ctx.alb_sg, move |instance_sg, alb_sg| {
            r.with(|c| {
                c.record(app_ingress(instance_sg, alb_sg));
                Ok(())
            })
        });
    }

    let r = ctx.downgrade();
    when_both(&ctx.vpc, &ctx.alb_sg, move |_vpc, alb_sg| {
        r.with(|c| {
            for port in Exposure::for_profile(profile).lb_ports {
                ingress(c, alb_sg.clone(), Peer::AnyIpv4, *port, "load balancer listener");
            }
            Ok(())
        })
    });

    let r = ctx.downgrade();
    let compute = match runtime {
        Runtime::Instance => &ctx.instance_sg,
        Runtime::Container => &ctx.service_sg,
    };
    when_both(&ctx.efs_sg, compute, move |efs_sg, compute_sg| {
        r.with(|c| {
            ingress(c, efs_sg, Peer::Group(compute_sg), NFS_PORT, "nfs from compute");
            Ok(())
        })
    });

    if runtime == Runtime::Container {
        let r = ctx.downgrade();
        when_both(&ctx.service_sg, &ctx.alb_sg, move |service_sg, alb_sg| {
            r.with(|c| {
                c.record(app_ingress(service_sg, alb_sg));
                Ok(())
            })
        });
    }
}

/// VPC flow logs with the posture's traffic type and retention.
fn flow_logs(ctx: &Context) {
    let r = ctx.downgrade();
    when_both(&ctx.vpc, &ctx.security_posture, move |vpc, posture| {
        r.with(|c| {
            if c.flow_logs.is_set() {
                return Ok(());
            }
            debug!(
                "[{}] flow logs: {:?} traffic, {} days",
                c.root(),
                posture.flow_log_traffic,
                posture.flow_log_retention_days
            );
            let flow_log = mint(c, ResourceKind::FlowLog, "vpc-flow-logs");
            c.record(Action::FlowLogs {
                flow_log: flow_log.clone(),
                network: vpc,
                traffic: posture.flow_log_traffic,
                retention_days: posture.flow_log_retention_days,
            });
            c.flow_logs.set(flow_log);
            Ok(())
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::profile::Selectors;
    use std::rc::Rc;

    fn start(runtime: Runtime, security: SecurityProfile, options: Options) -> Rc<Context> {
        Context::start(
            "sec",
            Selectors::recommended(Topology::Service, runtime, security),
            options,
        )
        .unwrap()
    }

    fn sg(id: &str) -> Handle {
        Handle::new(ResourceKind::SecurityGroup, id)
    }

    #[test]
    fn test_posture_table() {
        let dev = SecurityPosture::for_profile(SecurityProfile::Dev);
        assert!(!dev.flow_logs);
        assert_eq!(dev.log_retention_days, 7);

        let staging = SecurityPosture::for_profile(SecurityProfile::Staging);
        assert_eq!(staging.flow_log_traffic, TrafficType::All);
        assert_eq!((staging.min_instances, staging.max_instances), (1, 5));

        let production = SecurityPosture::for_profile(SecurityProfile::Production);
        assert!(production.guardduty && production.waf && production.multi_az);
        assert_eq!(production.backup_retention_days, 90);
    }

    #[test]
    fn test_dev_exposure() {
        let ctx = start(Runtime::Instance, SecurityProfile::Dev, Options::new());
        ctx.vpc.set(Handle::new(ResourceKind::Network, "vpc"));
        ctx.instance_sg.set(sg("app"));
        ctx.alb_sg.set(sg("lb"));

        let app = ctx.plan().ingress_for(&sg("app"));
        assert!(app.contains(&(Peer::AnyIpv4, SSH_PORT)));
        assert!(app.contains(&(Peer::AnyIpv4, APP_PORT)));
        assert!(app.contains(&(Peer::Group(sg("lb")), APP_PORT)));

        let lb = ctx.plan().ingress_for(&sg("lb"));
        assert_eq!(lb, vec![(Peer::AnyIpv4, HTTP_PORT), (Peer::AnyIpv4, HTTPS_PORT)]);
    }

    #[test]
    fn test_production_exposure() {
        let ctx = start(
            Runtime::Instance,
            SecurityProfile::Production,
            Options::new().with_domain("example.com").with_subdomain("ci").enable_ssl(),
        );
        ctx.vpc.set(Handle::new(ResourceKind::Network, "vpc"));
        ctx.instance_sg.set(sg("app"));
        ctx.alb_sg.set(sg("lb"));

        let app = ctx.plan().ingress_for(&sg("app"));
        assert_eq!(
            app,
            vec![
                (Peer::Cidr("10.0.1.0/24".to_string()), SSH_PORT),
                (Peer::Group(sg("lb")), APP_PORT),
            ]
        );
        assert_eq!(ctx.plan().ingress_for(&sg("lb")), vec![(Peer::AnyIpv4, HTTPS_PORT)]);
        assert!(ctx.flow_logs.is_set());
    }

    #[test]
    fn test_nfs_from_service_group() {
        let ctx = start(Runtime::Container, SecurityProfile::Staging, Options::new());
        ctx.efs_sg.set(sg("efs"));
        ctx.service_sg.set(sg("svc"));

        assert_eq!(
            ctx.plan().ingress_for(&sg("efs")),
            vec![(Peer::Group(sg("svc")), NFS_PORT)]
        );
    }

    #[test]
    fn test_hosted_zone_lookup_or_create() {
        let ctx = start(
            Runtime::Container,
            SecurityProfile::Dev,
            Options::new().with_domain("Example.com"),
        );
        assert!(ctx.zone.is_set());
        assert!(ctx.plan().actions().iter().any(|a| matches!(
            a,
            Action::HostedZone { lookup: true, domain, .. } if domain == "example.com"
        )));

        let ctx = start(
            Runtime::Container,
            SecurityProfile::Dev,
            Options::new().with_domain("example.com").create_zone(),
        );
        assert!(ctx.plan().actions().iter().any(|a| matches!(
            a,
            Action::HostedZone { lookup: false, .. }
        )));
    }

    fn populate_container(ctx: &Context) {
        ctx.vpc.set(Handle::new(ResourceKind::Network, "vpc"));
        ctx.alb.set(Handle::new(ResourceKind::LoadBalancer, "alb"));
        ctx.alb_sg.set(sg("lb"));
        ctx.http.set(Handle::new(ResourceKind::Listener, "http"));
        ctx.service.set(Handle::new(ResourceKind::Service, "svc"));
        ctx.container.set(Handle::new(ResourceKind::Container, "jenkins"));
    }

    #[test]
    fn test_production_without_ssl_is_accepted() {
        let ctx = start(Runtime::Container, SecurityProfile::Production, Options::new());
        populate_container(&ctx);
        ctx.efs_sg.set(sg("efs"));

        assert!(ctx.finalize().is_ok());
        assert!(ctx.https.get().is_none());
    }

    #[test]
    fn test_audited_profiles_require_efs_group() {
        let ctx = start(Runtime::Container, SecurityProfile::Staging, Options::new());
        populate_container(&ctx);

        let err = ctx.finalize().unwrap_err();
        assert_eq!(err.report().unwrap().messages(), vec!["required: efsSg"]);

        let ctx = start(Runtime::Container, SecurityProfile::Dev, Options::new());
        populate_container(&ctx);
        assert!(ctx.finalize().is_ok());
    }
}
