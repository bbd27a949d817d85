//! Build options consumed by rules and wiring.
//!
//! Options are a flat, typed bag of settings with documented defaults. They
//! are read by configurations, never written.

use std::fmt;

use crate::error::{ConfigurationError, ConfigurationResult};

/// How end users authenticate against the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    None,
    /// OIDC terminated at the load balancer; needs TLS there.
    AlbOidc,
    /// OIDC handled by the application itself.
    AppOidc,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::AlbOidc => "alb-oidc",
            AuthMode::AppOidc => "jenkins-oidc",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target-group health check settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HealthCheck {
    pub path: &'static str,
    pub interval_secs: u32,
    pub timeout_secs: u32,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            path: "/login",
            interval_secs: 30,
            timeout_secs: 5,
            healthy_threshold: 2,
            unhealthy_threshold: 3,
        }
    }
}

/// Settings for one build.
///
/// # Example
///
/// ```rust
/// use forgewire::Options;
///
/// let options = Options::new()
///     .with_domain("example.com")
///     .with_subdomain("ci")
///     .enable_ssl();
///
/// assert_eq!(options.fqdn().as_deref(), Some("ci.example.com"));
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub region: String,
    pub domain: Option<String>,
    pub subdomain: Option<String>,
    /// Explicit host name; wins over `subdomain.domain`.
    pub fqdn: Option<String>,
    pub enable_ssl: bool,
    pub cloudfront: bool,
    /// Create the hosted zone instead of looking up an existing one.
    pub create_zone: bool,
    pub auth_mode: AuthMode,
    pub min_instance_capacity: u32,
    pub max_instance_capacity: u32,
    pub cpu_target_utilization: u32,
    /// Container CPU units.
    pub cpu: u32,
    /// Container memory in MiB.
    pub memory: u32,
    pub health_check: HealthCheck,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            domain: None,
            subdomain: None,
            fqdn: None,
            enable_ssl: false,
            cloudfront: false,
            create_zone: false,
            auth_mode: AuthMode::None,
            min_instance_capacity: 1,
            max_instance_capacity: 3,
            cpu_target_utilization: 60,
            cpu: 1024,
            memory: 2048,
            health_check: HealthCheck::default(),
        }
    }
}

impl Options {
    /// Create options with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deployment region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the parent DNS domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the host label under the domain.
    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// Set an explicit fully qualified host name.
    pub fn with_fqdn(mut self, fqdn: impl Into<String>) -> Self {
        self.fqdn = Some(fqdn.into());
        self
    }

    /// Terminate TLS at the edge.
    pub fn enable_ssl(mut self) -> Self {
        self.enable_ssl = true;
        self
    }

    /// Front static content with a CDN.
    pub fn with_cloudfront(mut self) -> Self {
        self.cloudfront = true;
        self
    }

    /// Create the hosted zone rather than looking it up.
    pub fn create_zone(mut self) -> Self {
        self.create_zone = true;
        self
    }

    pub fn with_auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    /// Set instance or task capacity bounds.
    pub fn with_capacity(mut self, min: u32, max: u32) -> Self {
        self.min_instance_capacity = min;
        self.max_instance_capacity = max;
        self
    }

    pub fn with_cpu_target(mut self, percent: u32) -> Self {
        self.cpu_target_utilization = percent;
        self
    }

    /// Set container CPU units and memory.
    pub fn with_sizing(mut self, cpu: u32, memory: u32) -> Self {
        self.cpu = cpu;
        self.memory = memory;
        self
    }

    pub fn with_health_check(mut self, health_check: HealthCheck) -> Self {
        self.health_check = health_check;
        self
    }

    /// Check whether a domain is configured.
    pub fn has_domain(&self) -> bool {
        non_blank(&self.domain).is_some()
    }

    /// The public host name: explicit fqdn, else `subdomain.domain`, else the
    /// bare domain when the subdomain is blank.
    pub fn fqdn(&self) -> Option<String> {
        if let Some(fqdn) = non_blank(&self.fqdn) {
            return Some(normalize(fqdn));
        }
        match (self.subdomain.as_deref(), non_blank(&self.domain)) {
            (Some(sub), Some(domain)) if sub.trim().is_empty() => Some(normalize(domain)),
            (Some(sub), Some(domain)) => Some(normalize(&format!("{}.{}", sub.trim(), domain))),
            _ => None,
        }
    }

    /// Check whether a host name is available or can be composed.
    pub fn has_host(&self) -> bool {
        self.fqdn().is_some()
    }

    /// The record name to publish under the zone: the subdomain, or empty for
    /// the zone apex.
    pub fn record_name(&self) -> String {
        non_blank(&self.subdomain).unwrap_or_default().to_string()
    }

    /// The record name for a CDN alias: the explicit fqdn when one is set,
    /// else [`record_name`](Self::record_name).
    pub fn alias_record_name(&self) -> String {
        match non_blank(&self.fqdn) {
            Some(fqdn) => normalize(fqdn),
            None => self.record_name(),
        }
    }

    /// Validate option values.
    pub fn validate(&self) -> ConfigurationResult<()> {
        if let Some(domain) = non_blank(&self.domain) {
            check_dns_name("domain", domain)?;
        }
        if let Some(fqdn) = non_blank(&self.fqdn) {
            check_dns_name("fqdn", fqdn)?;
        }
        if let Some(sub) = non_blank(&self.subdomain) {
            check_dns_label("subdomain", sub)?;
        }
        if self.region.trim().is_empty() {
            return Err(invalid("region", "must not be empty"));
        }
        if self.max_instance_capacity < self.min_instance_capacity {
            return Err(invalid(
                "maxInstanceCapacity",
                format!(
                    "{} is below minInstanceCapacity {}",
                    self.max_instance_capacity, self.min_instance_capacity
                ),
            ));
        }
        if self.cpu_target_utilization > 100 {
            return Err(invalid(
                "cpuTargetUtilization",
                format!("{} is not a percentage", self.cpu_target_utilization),
            ));
        }
        if self.cpu == 0 || self.memory == 0 {
            return Err(invalid("cpu/memory", "must be greater than 0"));
        }
        Ok(())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn normalize(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidOption {
        key,
        reason: reason.into(),
    }
}

fn check_dns_label(key: &'static str, label: &str) -> ConfigurationResult<()> {
    let valid = !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(invalid(key, format!("`{label}` is not a valid DNS label")))
    }
}

fn check_dns_name(key: &'static str, name: &str) -> ConfigurationResult<()> {
    let name = name.trim_end_matches('.');
    if name.len() > 253 || !name.contains('.') {
        return Err(invalid(key, format!("`{name}` is not a valid DNS name")));
    }
    name.split('.')
        .try_for_each(|label| check_dns_label(key, label))
        .map_err(|_| invalid(key, format!("`{name}` is not a valid DNS name")))
}
