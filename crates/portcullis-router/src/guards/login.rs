use async_trait::async_trait;
use portcullis_core::Location;
use portcullis_pipeline::{Guard, GuardOutcome};

use super::GuardState;
use crate::context::GuardContext;

/// Query key under which the original target travels to the login page.
pub const REDIRECT_QUERY_KEY: &str = "redirect";

/// Requires an authenticated actor.
///
/// Anonymous actors are sent to the login destination with the target's
/// full path under [`REDIRECT_QUERY_KEY`]. The login destination itself is
/// always reachable for them; a logged-in actor landing there is sent on to
/// the default destination when one is configured.
#[derive(Debug, Clone, Default)]
pub struct LoginGuard {
    login_route: Option<Location>,
    default_route: Option<Location>,
}

impl LoginGuard {
    pub const NAME: &'static str = "login";

    pub fn new(login_route: Option<Location>, default_route: Option<Location>) -> Self {
        Self {
            login_route,
            default_route,
        }
    }

    /// Decide for one context.
    pub fn evaluate(&self, ctx: &GuardContext) -> GuardState {
        let logged_in = ctx.actor().is_logged_in();
        let on_login_page = self
            .login_route
            .as_ref()
            .is_some_and(|login| login.same_path(&ctx.target));

        if on_login_page {
            return match (&self.default_route, logged_in) {
                (Some(default), true) => GuardState::RedirectedToDefault(default.clone()),
                _ => GuardState::Allowed,
            };
        }

        if logged_in {
            return GuardState::Allowed;
        }

        match &self.login_route {
            Some(login) => GuardState::RedirectedToLogin(
                login
                    .clone()
                    .with_query(REDIRECT_QUERY_KEY, ctx.target.full_path()),
            ),
            None => {
                tracing::warn!(
                    target_path = %ctx.target.path,
                    "login guard has no login route; cancelling"
                );
                GuardState::Blocked(None)
            }
        }
    }
}

#[async_trait]
impl Guard<GuardContext> for LoginGuard {
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

#[cfg(test)]
mod tests {
    use super::*;
    use portcullis_core::StandardDecider;
    use portcullis_state::{ChangeNotifier, LoginInfo, PermissionState};
    use std::sync::Arc;

    fn ctx(target: Location, logged_in: bool) -> GuardContext {
        let notifier = Arc::new(ChangeNotifier::new(
            Arc::new(StandardDecider),
            PermissionState::guest("Guest"),
        ));
        if logged_in {
            notifier.update(|s| LoginInfo::new().actor_id(7u64).logged_in(true).apply_to(s));
        }
        GuardContext::new(target, None, Vec::new(), notifier)
    }

    fn guard() -> LoginGuard {
        LoginGuard::new(Some(Location::new("/login")), Some(Location::new("/home")))
    }

    #[test]
    fn test_anonymous_is_sent_to_login_with_target() {
        let target = Location::new("/admin").with_query("tab", "users");
        let state = guard().evaluate(&ctx(target, false));
        assert_eq!(
            state,
            GuardState::RedirectedToLogin(
                Location::new("/login").with_query("redirect", "/admin?tab=users")
            )
        );
    }

    #[test]
    fn test_redirect_back_keeps_every_target_param() {
        let target = Location::new("/admin").with_query("a", "1").with_query("b", "2");
        let state = guard().evaluate(&ctx(target.clone(), false));
        let GuardState::RedirectedToLogin(login) = state else {
            panic!("expected a login redirect");
        };

        let parsed: Location = login.full_path().parse().unwrap();
        assert_eq!(parsed.path, "/login");
        assert_eq!(parsed.query.len(), 1);
        let back: Location = parsed.query_param(REDIRECT_QUERY_KEY).unwrap().parse().unwrap();
        assert_eq!(back, target);
    }

    #[test]
    fn test_logged_in_is_allowed() {
        assert_eq!(guard().evaluate(&ctx(Location::new("/admin"), true)), GuardState::Allowed);
    }

    #[test]
    fn test_login_page_is_open_to_anonymous() {
        assert_eq!(guard().evaluate(&ctx(Location::new("/login"), false)), GuardState::Allowed);
    }

    #[test]
    fn test_logged_in_on_login_page_goes_to_default() {
        assert_eq!(
            guard().evaluate(&ctx(Location::new("/login"), true)),
            GuardState::RedirectedToDefault(Location::new("/home"))
        );
        let no_default = LoginGuard::new(Some(Location::new("/login")), None);
        assert_eq!(no_default.evaluate(&ctx(Location::new("/login"), true)), GuardState::Allowed);
    }

    #[test]
    fn test_missing_login_route_cancels() {
        let state = LoginGuard::default().evaluate(&ctx(Location::new("/admin"), false));
        assert_eq!(state, GuardState::Blocked(None));
    }
}
