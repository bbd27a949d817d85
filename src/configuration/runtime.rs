//! Compute substrate configurations: virtual-machine instances behind an
//! auto-scaling group, or containers in a managed service.

use tracing::{debug, warn};

use super::{mint, Configuration};
use crate::context::Context;
use crate::error::ForgeResult;
use crate::handle::{Handle, ResourceKind};
use crate::join::{when_all, when_all4, when_both};
use crate::plan::{Action, Peer};
use crate::profile::Topology;
use crate::rules::{forbid, require, when, Rule};

pub(crate) const APP_PORT: u16 = 8080;
pub(crate) const HTTPS_PORT: u16 = 443;

#[derive(Debug)]
pub struct InstanceRuntime;

#[derive(Debug)]
pub struct ContainerRuntime;

impl Configuration for InstanceRuntime {
    fn id(&self) -> &'static str {
        "runtime:instance"
    }

    fn rules(&self, ctx: &Context) -> Vec<Rule> {
        let compute = ctx.topology() != Topology::StaticSite;
        vec![
            when(compute, require("vpc", |c| &c.vpc)),
            when(compute, require("alb", |c| &c.alb)),
            when(compute, require("asg", |c| &c.asg)),
            when(compute, require("instanceSg", |c| &c.instance_sg)),
            when(compute, forbid("fargate", |c| &c.service)),
        ]
    }

    fn wire(&self, ctx: &Context) -> ForgeResult<()> {
        if ctx.topology() == Topology::StaticSite {
            debug!("[{}] static site: no instance wiring", ctx.root());
            return Ok(());
        }

        let r = ctx.downgrade();
        when_both(&ctx.asg, &ctx.alb_target_group, move |asg, target_group| {
            r.with(|c| {
                c.record(Action::AttachTarget {
                    target_group,
                    target: asg,
                });
                Ok(())
            })
        });

        let r = ctx.downgrade();
        when_both(&ctx.alb_sg, &ctx.instance_sg, move |alb_sg, instance_sg| {
            r.with(|c| {
                c.record(app_ingress(instance_sg, alb_sg));
                Ok(())
            })
        });

        let options = ctx.options();
        if options.enable_ssl {
            request_certificate(ctx);

            let r = ctx.downgrade();
            when_all4(
                &ctx.alb,
                &ctx.cert,
                &ctx.alb_target_group,
                &ctx.http,
                move |alb, cert, target_group, http| {
                    r.with(|c| {
                        let https = https_listener(c, alb, cert);
                        c.record(Action::Forward {
                            listener: https,
                            target_group,
                        });
                        c.record(Action::Redirect {
                            listener: http,
                            port: HTTPS_PORT,
                        });
                        Ok(())
                    })
                },
            );
        }

        if options.has_domain() {
            let record = options.record_name();
            let r = ctx.downgrade();
            when_both(&ctx.zone, &ctx.alb, move |zone, alb| {
                r.with(|c| {
                    c.record(Action::DnsAlias {
                        zone,
                        record: record.clone(),
                        target: alb,
                        ipv6: false,
                    });
                    Ok(())
                })
            });
        }
        Ok(())
    }
}

impl Configuration for ContainerRuntime {
    fn id(&self) -> &'static str {
        "runtime:container"
    }

    fn rules(&self, ctx: &Context) -> Vec<Rule> {
        let compute = ctx.topology() != Topology::StaticSite;
        vec![
            when(compute, require("vpc", |c| &c.vpc)),
            when(compute, require("alb", |c| &c.alb)),
            when(compute, require("http listener", |c| &c.http)),
            when(compute, require("fargate service", |c| &c.service)),
            when(compute, require("fargate container", |c| &c.container)),
            when(compute, forbid("targetGroup", |c| &c.alb_target_group)),
            when(compute, forbid("instanceSg", |c| &c.instance_sg)),
        ]
    }

    fn wire(&self, ctx: &Context) -> ForgeResult<()> {
        if ctx.topology() == Topology::StaticSite {
            debug!("[{}] static site: no container wiring", ctx.root());
            return Ok(());
        }

        let options = ctx.options();
        if !options.enable_ssl {
            let r = ctx.downgrade();
            when_both(&ctx.http, &ctx.service, move |http, service| {
                r.with(|c| {
                    let target_group = service_target_group(c, service)?;
                    c.record(Action::Forward {
                        listener: http,
                        target_group,
                    });
                    Ok(())
                })
            });
            return Ok(());
        }

        if !options.has_host() {
            warn!(
                "[{}] enableSsl=true without fqdn or subdomain+domain; skipping HTTPS wiring",
                ctx.root()
            );
            return Ok(());
        }

        request_certificate(ctx);

        let r = ctx.downgrade();
        when_both(&ctx.cert, &ctx.alb, move |cert, alb| {
            r.with(|c| {
                https_listener(c, alb, cert);
                Ok(())
            })
        });

        let r = ctx.downgrade();
        when_all(&ctx.https, &ctx.service, &ctx.cert, move |https, service, _cert| {
            r.with(|c| {
                let target_group = service_target_group(c, service)?;
                c.record(Action::Forward {
                    listener: https,
                    target_group,
                });
                Ok(())
            })
        });

        let r = ctx.downgrade();
        when_both(&ctx.https, &ctx.http, move |_https, http| {
            r.with(|c| {
                c.record(Action::Redirect {
                    listener: http,
                    port: HTTPS_PORT,
                });
                Ok(())
            })
        });
        Ok(())
    }
}

/// Ingress for application traffic arriving from the load balancer.
pub(crate) fn app_ingress(group: Handle, alb_sg: Handle) -> Action {
    Action::Ingress {
        group,
        peer: Peer::Group(alb_sg),
        port: APP_PORT,
        description: "application from load balancer".to_string(),
    }
}

/// Mint a DNS-validated certificate for the host once zone and load balancer
/// exist.
fn request_certificate(ctx: &Context) {
    let Some(domain) = ctx.options().fqdn() else {
        warn!(
            "[{}] enableSsl=true without a resolvable host; no certificate requested",
            ctx.root()
        );
        return;
    };

    let r = ctx.downgrade();
    when_both(&ctx.zone, &ctx.alb, move |zone, _alb| {
        r.with(|c| {
            if c.cert.is_set() {
                return Ok(());
            }
            let certificate = mint(c, ResourceKind::Certificate, "cert");
            c.record(Action::Certificate {
                certificate: certificate.clone(),
                domain: domain.clone(),
                zone,
            });
            c.cert.set(certificate);
            Ok(())
        })
    });
}

/// The HTTPS listener, created on first use.
fn https_listener(ctx: &Context, alb: Handle, cert: Handle) -> Handle {
    if let Some(https) = ctx.https.get() {
        return https;
    }
    let https = mint(ctx, ResourceKind::Listener, "https");
    ctx.record(Action::Listener {
        load_balancer: alb,
        listener: https.clone(),
        port: HTTPS_PORT,
        certificate: Some(cert),
    });
    ctx.https.set(https.clone());
    https
}

/// Target group fronting the container service.
fn service_target_group(ctx: &Context, service: Handle) -> ForgeResult<Handle> {
    let network = ctx.vpc.require()?;
    let target_group = mint(ctx, ResourceKind::TargetGroup, "service-tg");
    ctx.record(Action::TargetGroup {
        target_group: target_group.clone(),
        network,
        service,
        port: APP_PORT,
        health_check: ctx.options().health_check,
    });
    Ok(target_group)
}
