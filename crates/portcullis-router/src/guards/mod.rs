//! Built-in guards.
//!
//! Both guards follow the same small state machine, [`GuardState`]: they
//! start `Pending` and `evaluate` always lands in exactly one terminal state.
//! Only `Allowed` continues the chain.

mod login;
mod role;

pub use login::{LoginGuard, REDIRECT_QUERY_KEY};
pub use role::RoleGuard;

use std::sync::Arc;

use portcullis_core::Location;
use portcullis_pipeline::{GuardOutcome, GuardRegistry};

use crate::context::GuardContext;

/// Decision state of a built-in guard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GuardState {
    /// Not decided yet. `evaluate` never returns it; a guard state built by
    /// hand and left here cancels the navigation.
    #[default]
    Pending,

    /// Requirements met; the chain continues.
    Allowed,

    /// Authentication required; go to this login location.
    RedirectedToLogin(Location),

    /// Already logged in on the login page; go to the default location.
    RedirectedToDefault(Location),

    /// Requirements not met. Redirect when a location is given, else cancel.
    Blocked(Option<Location>),
}

impl GuardState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GuardState::Pending)
    }

    /// Turn the state into the pipeline outcome.
    ///
    /// An undecided state cancels the navigation.
    pub fn into_outcome(self, ctx: GuardContext) -> GuardOutcome<GuardContext> {
        match self {
            GuardState::Allowed => GuardOutcome::Continue(ctx),
            GuardState::RedirectedToLogin(location)
            | GuardState::RedirectedToDefault(location)
            | GuardState::Blocked(Some(location)) => GuardOutcome::Redirect(location),
            GuardState::Blocked(None) | GuardState::Pending => GuardOutcome::Block,
        }
    }
}

/// Destinations the built-in guards redirect to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardSettings {
    pub login_route: Option<Location>,
    pub default_route: Option<Location>,
    pub permission_deny_redirect_route: Option<Location>,
}

/// Register [`LoginGuard`] and [`RoleGuard`] under their default names.
pub fn register_builtin_guards(
    registry: &mut GuardRegistry<GuardContext>,
    settings: &GuardSettings,
) {
    registry.register(
        LoginGuard::NAME,
        Arc::new(LoginGuard::new(
            settings.login_route.clone(),
            settings.default_route.clone(),
        )),
    );
    registry.register(
        RoleGuard::NAME,
        Arc::new(RoleGuard::new(settings.permission_deny_redirect_route.clone())),
    );
}
