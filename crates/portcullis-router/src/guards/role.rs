use async_trait::async_trait;
use portcullis_core::Location;
use portcullis_pipeline::{Guard, GuardOutcome};

use super::GuardState;
use crate::context::GuardContext;

/// Checks every matched segment's [`AccessRequirement`]; all must pass.
///
/// On failure the navigation is redirected to the deny destination if one is
/// configured, otherwise cancelled. Anonymous actors are treated the same
/// way, the guard never sends anyone to login.
///
/// [`AccessRequirement`]: crate::route::AccessRequirement
#[derive(Debug, Clone, Default)]
pub struct RoleGuard {
    deny_route: Option<Location>,
}

impl RoleGuard {
    pub const NAME: &'static str = "access";

    pub fn new(deny_route: Option<Location>) -> Self {
        Self { deny_route }
    }

    pub fn evaluate(&self, ctx: &GuardContext) -> GuardState {
        let actor = ctx.actor();
        if ctx.requirements().all(|requirement| requirement.is_satisfied_by(actor)) {
            GuardState::Allowed
        } else {
            GuardState::Blocked(self.deny_route.clone())
        }
    }
}

#[async_trait]
impl Guard<GuardContext> for RoleGuard {
    async fn handle(&self, ctx: GuardContext) -> GuardOutcome<GuardContext> {
        let state = self.evaluate(&ctx);
        tracing::debug!(
            guard = Self::NAME,
            target_path = %ctx.target.path,
            ?state,
            "guard decided"
        );
        state.into_outcome(ctx)
    }
}
