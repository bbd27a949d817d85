//! The per-root build context.
//!
//! A `Context` owns every slot of one build, its immutable selectors and
//! options, the once-scheduler, the aggregate validator and the plan. It is
//! created fully installed by [`Context::start`] and consumed by
//! [`Context::finalize`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, info};

use crate::configuration::SecurityPosture;
use crate::error::{ConfigurationError, ForgeError, ForgeResult};
use crate::handle::Handle;
use crate::install;
use crate::once::OnceScheduler;
use crate::options::Options;
use crate::plan::{Action, Plan};
use crate::profile::{IamProfile, Runtime, SecurityProfile, Selectors, Topology};
use crate::rules::Rule;
use crate::slot::Slot;
use crate::stream::{create_stream, BuildEvent, EventSender, EventStream};
use crate::validate::Validator;

/// Build lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Axes are registering rules and wiring.
    Installing,
    /// Factories may populate slots.
    Open,
    /// The aggregate validator is running.
    Validating,
    Accepted,
    /// Terminal; the build must not be materialized.
    Rejected,
}

/// Slot registry and selectors of one build root.
pub struct Context {
    root: String,
    selectors: Selectors,
    options: Options,

    pub vpc: Slot<Handle>,
    pub alb: Slot<Handle>,
    pub asg: Slot<Handle>,
    pub efs: Slot<Handle>,
    pub logs: Slot<Handle>,
    pub zone: Slot<Handle>,
    pub instance_sg: Slot<Handle>,
    pub alb_target_group: Slot<Handle>,
    pub alb_sg: Slot<Handle>,
    /// HTTP listener on the load balancer.
    pub http: Slot<Handle>,
    pub efs_sg: Slot<Handle>,
    pub access_point: Slot<Handle>,
    /// Container service.
    pub service: Slot<Handle>,
    pub service_sg: Slot<Handle>,
    pub task_definition: Slot<Handle>,
    pub container: Slot<Handle>,
    /// HTTPS listener on the load balancer.
    pub https: Slot<Handle>,
    pub cert: Slot<Handle>,
    pub website_bucket: Slot<Handle>,
    pub distribution: Slot<Handle>,
    pub flow_logs: Slot<Handle>,
    pub instance_role: Slot<Handle>,
    pub execution_role: Slot<Handle>,
    pub task_role: Slot<Handle>,
    pub security_posture: Slot<SecurityPosture>,

    scheduler: OnceScheduler,
    validator: Validator,
    plan: Plan,
    phase: Cell<Phase>,
    fault: RefCell<Option<ForgeError>>,
    history: RefCell<Vec<BuildEvent>>,
    subscribers: RefCell<Vec<EventSender<BuildEvent>>>,
    this: Weak<Context>,
}

impl Context {
    /// Create a standalone context and install all four axes.
    ///
    /// Fails if the options are invalid or if wiring hits an empty slot it
    /// dereferences eagerly.
    pub fn start(
        root: impl Into<String>,
        selectors: Selectors,
        options: Options,
    ) -> ForgeResult<Rc<Context>> {
        let root = root.into();
        options.validate()?;

        debug!("Starting context `{}` with {}", root, selectors);
        let ctx = Rc::new_cyclic(|this| Context::new(root, selectors, options, this.clone()));
        install::install(&ctx)?;
        ctx.phase.set(Phase::Open);
        Ok(ctx)
    }

    fn new(root: String, selectors: Selectors, options: Options, this: Weak<Context>) -> Self {
        Self {
            root,
            selectors,
            options,
            vpc: Slot::new("vpc"),
            alb: Slot::new("alb"),
            asg: Slot::new("asg"),
            efs: Slot::new("efs"),
            logs: Slot::new("logs"),
            zone: Slot::new("zone"),
            instance_sg: Slot::new("instanceSg"),
            alb_target_group: Slot::new("albTargetGroup"),
            alb_sg: Slot::new("albSg"),
            http: Slot::new("http"),
            efs_sg: Slot::new("efsSg"),
            access_point: Slot::new("accessPoint"),
            service: Slot::new("fargateService"),
            service_sg: Slot::new("serviceSg"),
            task_definition: Slot::new("taskDefinition"),
            container: Slot::new("container"),
            https: Slot::new("https"),
            cert: Slot::new("cert"),
            website_bucket: Slot::new("websiteBucket"),
            distribution: Slot::new("distribution"),
            flow_logs: Slot::new("flowLogs"),
            instance_role: Slot::new("instanceRole"),
            execution_role: Slot::new("executionRole"),
            task_role: Slot::new("taskRole"),
            security_posture: Slot::new("securityPosture"),
            scheduler: OnceScheduler::new(),
            validator: Validator::new(),
            plan: Plan::new(),
            phase: Cell::new(Phase::Installing),
            fault: RefCell::new(None),
            history: RefCell::new(Vec::new()),
            subscribers: RefCell::new(Vec::new()),
            this,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn selectors(&self) -> Selectors {
        self.selectors
    }

    pub fn topology(&self) -> Topology {
        self.selectors.topology
    }

    pub fn runtime(&self) -> Runtime {
        self.selectors.runtime
    }

    pub fn security(&self) -> SecurityProfile {
        self.selectors.security
    }

    pub fn iam_profile(&self) -> IamProfile {
        self.selectors.iam_profile
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// The ledger of wiring side effects recorded so far.
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Run `action` the first time `key` is seen on this context.
    pub fn once<R>(&self, key: &str, action: impl FnOnce() -> R) -> Option<R> {
        let result = self.scheduler.once(key, action);
        if result.is_some() {
            self.emit(BuildEvent::Wired {
                key: key.to_string(),
            });
        }
        result
    }

    /// Stage keys that have fired, in firing order.
    pub fn wired_keys(&self) -> Vec<String> {
        self.scheduler.keys()
    }

    /// Record a side effect in the plan; equal actions are kept once.
    pub fn record(&self, action: Action) -> bool {
        let fresh = self.plan.record(action.clone());
        if fresh {
            debug!("[{}] recorded {}", self.root, action.label());
            self.emit(BuildEvent::ActionRecorded(action));
        }
        fresh
    }

    /// A weak handle for closures that outlive the current call.
    pub fn downgrade(&self) -> ContextRef {
        ContextRef(self.this.clone())
    }

    /// Store a failure raised by deferred wiring.
    ///
    /// The first fault wins; it is returned by [`Context::finalize`].
    pub fn fail(&self, err: ForgeError) {
        error!("[{}] wiring failed: {}", self.root, err);
        self.emit(BuildEvent::Faulted(err.to_string()));
        let mut fault = self.fault.borrow_mut();
        if fault.is_none() {
            *fault = Some(err);
        }
    }

    /// The stored fault, if deferred wiring failed.
    pub fn fault(&self) -> Option<ForgeError> {
        self.fault.borrow().clone()
    }

    /// Number of rules registered by the installed axes.
    pub fn rule_count(&self) -> usize {
        self.validator.len()
    }

    pub(crate) fn register_rules(&self, source: &str, rules: Vec<Rule>) {
        self.validator.register(source, rules);
    }

    /// Run the aggregate validator and close the build.
    ///
    /// Returns the stored fault if deferred wiring failed, otherwise every
    /// rule violation in one report.
    pub fn finalize(&self) -> ForgeResult<()> {
        match self.phase.get() {
            Phase::Validating | Phase::Accepted | Phase::Rejected => {
                return Err(ConfigurationError::AlreadyFinalized(self.root.clone()).into());
            }
            Phase::Installing | Phase::Open => {}
        }
        self.phase.set(Phase::Validating);

        let outcome = match self.fault() {
            Some(fault) => Err(fault),
            None => {
                let report = self.validator.run(self);
                if report.is_empty() {
                    Ok(())
                } else {
                    Err(ForgeError::Validation(report))
                }
            }
        };

        let violations = outcome
            .as_ref()
            .err()
            .and_then(ForgeError::report)
            .map_or(0, |report| report.len());
        match &outcome {
            Ok(()) => {
                info!("[{}] build accepted ({} actions)", self.root, self.plan.len());
                self.phase.set(Phase::Accepted);
            }
            Err(err) => {
                info!("[{}] build rejected: {}", self.root, err);
                self.phase.set(Phase::Rejected);
            }
        }
        self.emit(BuildEvent::Finalized {
            accepted: outcome.is_ok(),
            violations,
        });
        outcome
    }

    /// Diagnostic names of the slots currently holding a value.
    pub fn present_slots(&self) -> Vec<&'static str> {
        let mut present: Vec<&'static str> = self
            .handle_slots()
            .into_iter()
            .filter(|slot| slot.is_set())
            .map(|slot| slot.name())
            .collect();
        if self.security_posture.is_set() {
            present.push(self.security_posture.name());
        }
        present
    }

    /// Subscribe to build events.
    ///
    /// Events already emitted are replayed first, so installation events
    /// are visible to subscribers that arrive after `start`.
    pub fn subscribe(&self) -> EventStream<BuildEvent> {
        let (sender, stream) = create_stream();
        for event in self.history.borrow().iter() {
            let _ = sender.send(event.clone());
        }
        self.subscribers.borrow_mut().push(sender);
        stream
    }

    pub(crate) fn emit(&self, event: BuildEvent) {
        self.subscribers
            .borrow_mut()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
        self.history.borrow_mut().push(event);
    }

    fn handle_slots(&self) -> [&Slot<Handle>; 24] {
        [
            &self.vpc,
            &self.alb,
            &self.asg,
            &self.efs,
            &self.logs,
            &self.zone,
            &self.instance_sg,
            &self.alb_target_group,
            &self.alb_sg,
            &self.http,
            &self.efs_sg,
            &self.access_point,
            &self.service,
            &self.service_sg,
            &self.task_definition,
            &self.container,
            &self.https,
            &self.cert,
            &self.website_bucket,
            &self.distribution,
            &self.flow_logs,
            &self.instance_role,
            &self.execution_role,
            &self.task_role,
        ]
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("root", &self.root)
            .field("selectors", &self.selectors)
            .field("phase", &self.phase.get())
            .field("present", &self.present_slots())
            .finish()
    }
}

/// Weak reference to a context, held by deferred wiring.
#[derive(Debug, Clone)]
pub struct ContextRef(Weak<Context>);

impl ContextRef {
    pub fn upgrade(&self) -> Option<Rc<Context>> {
        self.0.upgrade()
    }

    /// Run `f` against the context if it is still alive, storing any error
    /// as the context's fault.
    pub fn with(&self, f: impl FnOnce(&Context) -> ForgeResult<()>) {
        if let Some(ctx) = self.0.upgrade() {
            if let Err(err) = f(&ctx) {
                ctx.fail(err);
            }
        }
    }
}
