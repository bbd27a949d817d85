//! Axis installation.

use tracing::debug;

use crate::configuration::{configuration_for, SecurityPosture};
use crate::context::Context;
use crate::error::ForgeResult;
use crate::profile::Axis;
use crate::stream::BuildEvent;

/// Once-scheduler key guarding the wiring of one axis value.
pub fn wiring_key(axis: Axis, value: &str) -> String {
    format!("ProfileWiring:{axis}:{value}")
}

/// Install every axis in [`Axis::INSTALL_ORDER`].
///
/// Rules go into the context's validator under the configuration id. The
/// IAM axis wires synchronously; the others wire through the once-scheduler.
pub(crate) fn install(ctx: &Context) -> ForgeResult<()> {
    let selectors = ctx.selectors();
    for axis in Axis::INSTALL_ORDER {
        let configuration = configuration_for(axis, &selectors);
        debug!("[{}] installing {}", ctx.root(), configuration.id());

        ctx.register_rules(configuration.id(), configuration.rules(ctx));
        ctx.emit(BuildEvent::Installed {
            axis,
            configuration: configuration.id(),
        });

        match axis {
            Axis::Iam => configuration.wire(ctx)?,
            Axis::Runtime | Axis::Topology | Axis::Security => {
                if axis == Axis::Security {
                    ctx.security_posture
                        .set(SecurityPosture::for_profile(selectors.security));
                }
                let key = wiring_key(axis, selectors.value(axis));
                ctx.once(&key, || configuration.wire(ctx)).transpose()?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wiring_key() {
        assert_eq!(
            wiring_key(Axis::Runtime, "container"),
            "ProfileWiring:Runtime:container"
        );
        assert_eq!(wiring_key(Axis::Security, "dev"), "ProfileWiring:Security:dev");
    }
}
