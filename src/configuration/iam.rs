//! Permission profile configurations and the permission matrix.

use tracing::debug;

use super::{mint, Configuration};
use crate::context::Context;
use crate::error::ForgeResult;
use crate::handle::ResourceKind;
use crate::plan::{Action, Statement};
use crate::profile::{IamProfile, Runtime, Topology};
use crate::rules::{check, Rule};

const CORE_PERMISSIONS: &[&str] = &[
    "logs:CreateLogGroup",
    "logs:CreateLogStream",
    "logs:PutLogEvents",
    "logs:DescribeLogGroups",
    "logs:DescribeLogStreams",
];

fn instance_permissions(profile: IamProfile) -> &'static [&'static str] {
    match profile {
        IamProfile::Minimal => &[
            "ssm:GetParameter",
            "ssm:GetParameters",
            "ssm:GetParametersByPath",
            "ssm:SendCommand",
            "ssm:ListCommandInvocations",
            "cloudwatch:PutMetricData",
        ],
        IamProfile::Standard => &[
            "ssm:GetParameter",
            "ssm:GetParameters",
            "ssm:GetParametersByPath",
            "ssm:SendCommand",
            "ssm:ListCommandInvocations",
            "ssm:DescribeInstanceInformation",
            "cloudwatch:PutMetricData",
            "cloudwatch:GetMetricStatistics",
            "cloudwatch:ListMetrics",
            "s3:GetObject",
            "s3:PutObject",
            "s3:ListBucket",
        ],
        IamProfile::Extended => &[
            "ssm:*",
            "cloudwatch:*",
            "ec2:DescribeInstances",
            "ec2:DescribeVolumes",
            "ec2:DescribeSnapshots",
            "ec2:DescribeImages",
            "ec2:DescribeSecurityGroups",
            "ec2:DescribeVpcs",
            "ec2:DescribeSubnets",
            "s3:*",
        ],
    }
}

fn container_permissions(profile: IamProfile) -> &'static [&'static str] {
    match profile {
        IamProfile::Minimal => &[
            "ecr:GetAuthorizationToken",
            "ecr:BatchCheckLayerAvailability",
            "ecr:GetDownloadUrlForLayer",
            "ecr:BatchGetImage",
        ],
        IamProfile::Standard => &[
            "ecr:GetAuthorizationToken",
            "ecr:BatchCheckLayerAvailability",
            "ecr:GetDownloadUrlForLayer",
            "ecr:BatchGetImage",
            "ecr:DescribeRepositories",
            "ecr:ListImages",
            "cloudwatch:PutMetricData",
            "cloudwatch:GetMetricStatistics",
            "cloudwatch:ListMetrics",
            "s3:GetObject",
            "s3:PutObject",
            "s3:ListBucket",
        ],
        IamProfile::Extended => &[
            "ecr:*",
            "ecs:DescribeClusters",
            "ecs:DescribeServices",
            "ecs:DescribeTasks",
            "ecs:DescribeTaskDefinition",
            "ecs:ListTasks",
            "ecs:ListServices",
            "cloudwatch:*",
            "s3:*",
        ],
    }
}

fn file_system_permissions(profile: IamProfile) -> &'static [&'static str] {
    match profile {
        IamProfile::Minimal => &[
            "elasticfilesystem:ClientMount",
            "elasticfilesystem:ClientWrite",
        ],
        IamProfile::Standard => &[
            "elasticfilesystem:ClientMount",
            "elasticfilesystem:ClientWrite",
            "elasticfilesystem:ClientRootAccess",
            "elasticfilesystem:DescribeMountTargets",
        ],
        IamProfile::Extended => &["elasticfilesystem:*"],
    }
}

fn load_balancer_permissions(profile: IamProfile) -> &'static [&'static str] {
    match profile {
        IamProfile::Minimal => &[
            "elasticloadbalancing:DescribeLoadBalancers",
            "elasticloadbalancing:DescribeTargetGroups",
            "elasticloadbalancing:DescribeTargetHealth",
        ],
        IamProfile::Standard => &[
            "elasticloadbalancing:DescribeLoadBalancers",
            "elasticloadbalancing:DescribeTargetGroups",
            "elasticloadbalancing:DescribeTargetHealth",
            "elasticloadbalancing:DescribeListeners",
            "elasticloadbalancing:DescribeRules",
        ],
        IamProfile::Extended => &["elasticloadbalancing:*"],
    }
}

fn has_file_system(topology: Topology) -> bool {
    matches!(topology, Topology::SingleNode | Topology::Service)
}

/// Every permission a workload of this shape needs under `profile`.
pub fn required_permissions(
    topology: Topology,
    runtime: Runtime,
    profile: IamProfile,
) -> Vec<&'static str> {
    let mut permissions = CORE_PERMISSIONS.to_vec();
    permissions.extend_from_slice(match runtime {
        Runtime::Instance => instance_permissions(profile),
        Runtime::Container => container_permissions(profile),
    });
    if has_file_system(topology) {
        permissions.extend_from_slice(file_system_permissions(profile));
        permissions.extend_from_slice(load_balancer_permissions(profile));
    }
    permissions
}

fn grants(granted: &str, permission: &str) -> bool {
    granted == permission
        || granted == "*"
        || granted
            .strip_suffix('*')
            .is_some_and(|prefix| permission.starts_with(prefix))
}

/// Required permissions not covered by `provided`, wildcards honored.
pub fn missing_permissions(
    provided: &[&str],
    topology: Topology,
    runtime: Runtime,
    profile: IamProfile,
) -> Vec<&'static str> {
    required_permissions(topology, runtime, profile)
        .into_iter()
        .filter(|required| !provided.iter().any(|granted| grants(granted, required)))
        .collect()
}

#[derive(Debug)]
pub struct IamConfiguration {
    profile: IamProfile,
}

pub(super) static MINIMAL: IamConfiguration = IamConfiguration {
    profile: IamProfile::Minimal,
};
pub(super) static STANDARD: IamConfiguration = IamConfiguration {
    profile: IamProfile::Standard,
};
pub(super) static EXTENDED: IamConfiguration = IamConfiguration {
    profile: IamProfile::Extended,
};

impl IamConfiguration {
    fn statements(&self, ctx: &Context) -> Vec<Statement> {
        let log_scope = match self.profile {
            IamProfile::Minimal => format!("arn:aws:logs:{}:*:log-group:*", ctx.options().region),
            IamProfile::Standard | IamProfile::Extended => "*".to_string(),
        };

        let mut statements = vec![
            Statement::new("Logs", CORE_PERMISSIONS, &[log_scope.as_str()]),
            Statement::new(
                "Runtime",
                match ctx.runtime() {
                    Runtime::Instance => instance_permissions(self.profile),
                    Runtime::Container => container_permissions(self.profile),
                },
                &["*"],
            ),
        ];
        if has_file_system(ctx.topology()) {
            statements.push(Statement::new(
                "FileSystem",
                file_system_permissions(self.profile),
                &["*"],
            ));
            statements.push(Statement::new(
                "LoadBalancer",
                load_balancer_permissions(self.profile),
                &["*"],
            ));
        }
        statements
    }
}

impl Configuration for IamConfiguration {
    fn id(&self) -> &'static str {
        match self.profile {
            IamProfile::Minimal => "iam:minimal",
            IamProfile::Standard => "iam:standard",
            IamProfile::Extended => "iam:extended",
        }
    }

    fn rules(&self, ctx: &Context) -> Vec<Rule> {
        let message = format!(
            "iam profile {} is not permitted under security profile {}",
            self.profile,
            ctx.security()
        );
        let profile = self.profile;
        vec![check(message, move |c| profile.is_permitted_under(c.security()))]
    }

    fn wire(&self, ctx: &Context) -> ForgeResult<()> {
        if ctx.topology() == Topology::StaticSite {
            debug!("[{}] static site: no roles", ctx.root());
            return Ok(());
        }

        match ctx.runtime() {
            Runtime::Instance => {
                if ctx.instance_role.is_set() {
                    return Ok(());
                }
                let role = mint(ctx, ResourceKind::Role, "instance-role");
                ctx.record(Action::Role {
                    role: role.clone(),
                    principal: "ec2.amazonaws.com".to_string(),
                    managed_policies: vec!["AmazonSSMManagedInstanceCore".to_string()],
                    statements: self.statements(ctx),
                });
                ctx.instance_role.set(role);
            }
            Runtime::Container => {
                if ctx.execution_role.is_set() && ctx.task_role.is_set() {
                    return Ok(());
                }
                let execution = mint(ctx, ResourceKind::Role, "execution-role");
                ctx.record(Action::Role {
                    role: execution.clone(),
                    principal: "ecs-tasks.amazonaws.com".to_string(),
                    managed_policies: vec![
                        "service-role/AmazonECSTaskExecutionRolePolicy".to_string()
                    ],
                    statements: Vec::new(),
                });

                let task = mint(ctx, ResourceKind::Role, "task-role");
                ctx.record(Action::Role {
                    role: task.clone(),
                    principal: "ecs-tasks.amazonaws.com".to_string(),
                    managed_policies: Vec::new(),
                    statements: self.statements(ctx),
                });

                ctx.execution_role.set(execution);
                ctx.task_role.set(task);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::profile::{SecurityProfile, Selectors};

    #[test]
    fn test_required_permissions_by_shape() {
        let site = required_permissions(Topology::StaticSite, Runtime::Container, IamProfile::Minimal);
        assert_eq!(site.len(), CORE_PERMISSIONS.len() + 4);

        let service = required_permissions(Topology::Service, Runtime::Instance, IamProfile::Extended);
        assert!(service.contains(&"elasticfilesystem:*"));
        assert!(service.contains(&"elasticloadbalancing:*"));
    }

    #[test]
    fn test_missing_permissions_honors_wildcards() {
        let provided = ["logs:*", "ecr:*"];
        let missing = missing_permissions(
            &provided,
            Topology::StaticSite,
            Runtime::Container,
            IamProfile::Minimal,
        );
        assert!(missing.is_empty());

        let missing = missing_permissions(
            &["logs:PutLogEvents"],
            Topology::StaticSite,
            Runtime::Container,
            IamProfile::Minimal,
        );
        assert!(missing.contains(&"logs:CreateLogGroup"));
        assert!(missing_permissions(&["*"], Topology::Service, Runtime::Instance, IamProfile::Standard)
            .is_empty());
    }

    #[test]
    fn test_rule_message() {
        let ctx = Context::start(
            "iam",
            Selectors::recommended(Topology::Service, Runtime::Container, SecurityProfile::Production)
                .with_iam_profile(IamProfile::Extended),
            Options::new(),
        )
        .unwrap();

        let rules = EXTENDED.rules(&ctx);
        assert_eq!(
            rules[0].check(&ctx),
            vec!["iam profile extended is not permitted under security profile production".to_string()]
        );
    }

    #[test]
    fn test_container_roles() {
        let ctx = Context::start(
            "iam",
            Selectors::recommended(Topology::Service, Runtime::Container, SecurityProfile::Production),
            Options::new().with_region("eu-west-1"),
        )
        .unwrap();

        assert!(ctx.execution_role.is_set());
        assert!(ctx.task_role.is_set());
        assert!(!ctx.instance_role.is_set());

        let task_role = ctx
            .plan()
            .actions()
            .into_iter()
            .find_map(|a| match a {
                Action::Role { role, statements, .. } if role.id() == "iam-task-role" => {
                    Some(statements)
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(task_role[0].resources, vec!["arn:aws:logs:eu-west-1:*:log-group:*"]);
        assert_eq!(task_role.len(), 4);
    }

    #[test]
    fn test_static_site_has_no_roles() {
        let ctx = Context::start(
            "iam",
            Selectors::recommended(Topology::StaticSite, Runtime::Instance, SecurityProfile::Dev),
            Options::new(),
        )
        .unwrap();
        assert!(ctx.plan().filter(|a| a.label() == "role").is_empty());
    }
}
