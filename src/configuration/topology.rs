//! Deployment shape configurations.

use tracing::debug;

use super::{mint, Configuration};
use crate::context::Context;
use crate::error::ForgeResult;
use crate::handle::{Handle, ResourceKind};
use crate::join::when_both;
use crate::options::AuthMode;
use crate::plan::Action;
use crate::profile::Runtime;
use crate::rules::{check, forbid, require, when, Rule};

#[derive(Debug)]
pub struct SingleNodeTopology;

#[derive(Debug)]
pub struct ServiceTopology;

#[derive(Debug)]
pub struct StaticSiteTopology;

fn oidc_needs_ssl() -> Rule {
    check("authMode=alb-oidc requires enableSsl=true", |c| {
        c.options().auth_mode != AuthMode::AlbOidc || c.options().enable_ssl
    })
}

fn ssl_needs_host() -> Rule {
    check("enableSsl=true requires fqdn OR (subdomain + domain)", |c| {
        !c.options().enable_ssl || c.options().has_host()
    })
}

/// A and AAAA aliases from `record` to `target`.
fn alias_both(ctx: &Context, zone: Handle, record: String, target: Handle) {
    for ipv6 in [false, true] {
        ctx.record(Action::DnsAlias {
            zone: zone.clone(),
            record: record.clone(),
            target: target.clone(),
            ipv6,
        });
    }
}

impl Configuration for SingleNodeTopology {
    fn id(&self) -> &'static str {
        "topology:single-node"
    }

    fn rules(&self, _ctx: &Context) -> Vec<Rule> {
        vec![
            check("single-node topology requires runtime=instance", |c| {
                c.runtime() == Runtime::Instance
            }),
            oidc_needs_ssl(),
            ssl_needs_host(),
        ]
    }

    fn wire(&self, ctx: &Context) -> ForgeResult<()> {
        let options = ctx.options();
        if !options.has_domain() || options.record_name().is_empty() {
            return Ok(());
        }

        let r = ctx.downgrade();
        when_both(&ctx.zone, &ctx.alb, move |zone, alb| {
            r.with(|c| {
                alias_both(c, zone, c.options().record_name(), alb);
                Ok(())
            })
        });
        Ok(())
    }
}

impl Configuration for ServiceTopology {
    fn id(&self) -> &'static str {
        "topology:service"
    }

    fn rules(&self, ctx: &Context) -> Vec<Rule> {
        vec![
            oidc_needs_ssl(),
            ssl_needs_host(),
            when(ctx.runtime() == Runtime::Container, forbid("asg", |c| &c.asg)),
        ]
    }

    fn wire(&self, ctx: &Context) -> ForgeResult<()> {
        let options = ctx.options();
        let (min, max) = (options.min_instance_capacity, options.max_instance_capacity);
        if min == 0 || max <= min {
            debug!("[{}] capacity {}..{}: no scaling policy", ctx.root(), min, max);
            return Ok(());
        }
        let cpu_target = options.cpu_target_utilization;

        let r = ctx.downgrade();
        let scale = move |target: Handle| {
            r.with(|c| {
                c.record(Action::Scaling {
                    target,
                    min,
                    max,
                    cpu_target,
                });
                Ok(())
            })
        };

        match ctx.runtime() {
            Runtime::Container => {
                when_both(&ctx.service, &ctx.http, move |service, _http| scale(service))
            }
            Runtime::Instance => {
                when_both(&ctx.asg, &ctx.alb_target_group, move |asg, _tg| scale(asg))
            }
        }
        Ok(())
    }
}

impl Configuration for StaticSiteTopology {
    fn id(&self) -> &'static str {
        "topology:static-site"
    }

    fn rules(&self, ctx: &Context) -> Vec<Rule> {
        let options = ctx.options();
        let (cloudfront, domain) = (options.cloudfront, options.has_domain());
        vec![
            check("enableSsl=true requires cloudfront=true", |c| {
                !c.options().enable_ssl || c.options().cloudfront
            }),
            check("cloudfront=true requires fqdn OR (subdomain + domain)", |c| {
                !c.options().cloudfront || c.options().has_host()
            }),
            require("websiteBucket", |c| &c.website_bucket),
            when(cloudfront, require("distribution", |c| &c.distribution)),
            when(domain, require("hosted zone", |c| &c.zone)),
            when(domain && cloudfront, require("certificate", |c| &c.cert)),
            forbid("asg", |c| &c.asg),
            forbid("fargate", |c| &c.service),
            forbid("alb", |c| &c.alb),
        ]
    }

    fn wire(&self, ctx: &Context) -> ForgeResult<()> {
        ctx.once("StaticSite:bucket", || {
            if ctx.website_bucket.is_set() {
                return;
            }
            let bucket = mint(ctx, ResourceKind::Bucket, "site");
            ctx.record(Action::Bucket {
                bucket: bucket.clone(),
                index_document: "index.html".to_string(),
                error_document: "error.html".to_string(),
            });
            ctx.website_bucket.set(bucket);
        });

        let options = ctx.options();
        if !options.cloudfront {
            return Ok(());
        }

        match options.fqdn() {
            Some(domain) if options.has_domain() => {
                let r = ctx.downgrade();
                when_both(&ctx.zone, &ctx.website_bucket, move |zone, _bucket| {
                    r.with(|c| {
                        if c.cert.is_set() {
                            return Ok(());
                        }
                        let certificate = mint(c, ResourceKind::Certificate, "site-cert");
                        c.record(Action::Certificate {
                            certificate: certificate.clone(),
                            domain: domain.clone(),
                            zone,
                        });
                        c.cert.set(certificate);
                        Ok(())
                    })
                });

                let r = ctx.downgrade();
                when_both(&ctx.website_bucket, &ctx.cert, move |bucket, cert| {
                    r.with(|c| distribute(c, bucket, Some(cert)))
                });
            }
            _ => {
                let bucket = ctx.website_bucket.require()?;
                distribute(ctx, bucket, None)?;
            }
        }

        let r = ctx.downgrade();
        when_both(&ctx.zone, &ctx.distribution, move |zone, distribution| {
            r.with(|c| {
                c.once("StaticSite:alias", || {
                    alias_both(c, zone, c.options().alias_record_name(), distribution)
                });
                Ok(())
            })
        });
        Ok(())
    }
}

/// CDN distribution over the website bucket, created once.
fn distribute(ctx: &Context, bucket: Handle, certificate: Option<Handle>) -> ForgeResult<()> {
    ctx.once("StaticSite:distribution", || {
        if ctx.distribution.is_set() {
            return;
        }
        let distribution = mint(ctx, ResourceKind::Distribution, "cdn");
        let domains = match (&certificate, ctx.options().fqdn()) {
            (Some(_), Some(fqdn)) => vec![fqdn],
            _ => Vec::new(),
        };
        ctx.record(Action::Distribution {
            distribution: distribution.clone(),
            origin: bucket,
            certificate,
            domains,
        });
        ctx.distribution.set(distribution);
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::context::Context;
    use crate::handle::{Handle, ResourceKind};
    use crate::options::{AuthMode, Options};
    use crate::plan::Action;
    use crate::profile::{Runtime, SecurityProfile, Selectors, Topology};

    fn start(topology: Topology, runtime: Runtime, options: Options) -> Rc<Context> {
        Context::start(
            "topo",
            Selectors::recommended(topology, runtime, SecurityProfile::Dev),
            options,
        )
        .unwrap()
    }

    #[test]
    fn test_single_node_requires_instance() {
        let ctx = start(Topology::SingleNode, Runtime::Container, Options::new());
        let report = ctx.finalize().unwrap_err();
        assert!(report
            .report()
            .unwrap()
            .contains("single-node topology requires runtime=instance"));
    }

    #[test]
    fn test_oidc_needs_ssl() {
        let ctx = start(
            Topology::Service,
            Runtime::Container,
            Options::new().with_auth_mode(AuthMode::AlbOidc),
        );
        let err = ctx.finalize().unwrap_err();
        assert!(err
            .report()
            .unwrap()
            .contains("authMode=alb-oidc requires enableSsl=true"));
    }

    #[test]
    fn test_service_scaling_for_containers() {
        let ctx = start(Topology::Service, Runtime::Container, Options::new().with_capacity(2, 6));
        ctx.service.set(Handle::new(ResourceKind::Service, "svc"));
        ctx.http.set(Handle::new(ResourceKind::Listener, "http"));

        assert_eq!(
            ctx.plan().filter(|a| a.label() == "scaling"),
            vec![Action::Scaling {
                target: Handle::new(ResourceKind::Service, "svc"),
                min: 2,
                max: 6,
                cpu_target: 60,
            }]
        );
    }

    #[test]
    fn test_service_no_scaling_for_fixed_capacity() {
        let ctx = start(Topology::Service, Runtime::Instance, Options::new().with_capacity(2, 2));
        ctx.asg.set(Handle::new(ResourceKind::AutoScalingGroup, "asg"));
        ctx.alb_target_group.set(Handle::new(ResourceKind::TargetGroup, "tg"));

        assert!(ctx.plan().filter(|a| a.label() == "scaling").is_empty());
    }

    #[test]
    fn test_single_node_aliases() {
        let ctx = start(
            Topology::SingleNode,
            Runtime::Instance,
            Options::new().with_domain("example.com").with_subdomain("ci"),
        );
        ctx.alb.set(Handle::new(ResourceKind::LoadBalancer, "alb"));

        let aliases = ctx.plan().filter(|a| a.label() == "dns-alias");
        assert_eq!(aliases.len(), 2);
    }

    #[test]
    fn test_static_site_stages() {
        let ctx = start(
            Topology::StaticSite,
            Runtime::Container,
            Options::new()
                .with_domain("example.com")
                .with_subdomain("www")
                .with_cloudfront(),
        );

        assert!(ctx.website_bucket.is_set());
        assert!(ctx.zone.is_set());
        assert!(ctx.cert.is_set());
        assert!(ctx.distribution.is_set());
        assert_eq!(ctx.plan().filter(|a| a.label() == "dns-alias").len(), 2);
        assert!(ctx.wired_keys().contains(&"StaticSite:alias".to_string()));
        assert!(ctx.finalize().is_ok());
    }

    #[test]
    fn test_static_site_alias_uses_fqdn() {
        let ctx = start(
            Topology::StaticSite,
            Runtime::Container,
            Options::new()
                .with_domain("example.com")
                .with_fqdn("Docs.Example.com")
                .with_cloudfront(),
        );

        let records: Vec<String> = ctx
            .plan()
            .filter(|a| a.label() == "dns-alias")
            .into_iter()
            .filter_map(|a| match a {
                Action::DnsAlias { record, .. } => Some(record),
                _ => None,
            })
            .collect();
        assert_eq!(records, vec!["docs.example.com", "docs.example.com"]);
    }

    #[test]
    fn test_static_site_forbids_compute() {
        let ctx = start(Topology::StaticSite, Runtime::Instance, Options::new());
        ctx.alb.set(Handle::new(ResourceKind::LoadBalancer, "alb"));

        let err = ctx.finalize().unwrap_err();
        assert_eq!(err.report().unwrap().messages(), vec!["forbidden: alb"]);
    }
}
