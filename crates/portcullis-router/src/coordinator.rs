//! Navigation guard coordination.
//!
//! For each navigation the coordinator resolves the target, collects the
//! guard references of the matched segments (parent first, global guards in
//! front), looks named guards up in the registry, and runs one fresh
//! [`MiddlewarePipeline`] over a [`GuardContext`].

use std::sync::{Arc, PoisonError};

use portcullis_core::Location;
use portcullis_pipeline::{GuardOutcome, GuardRef, MiddlewarePipeline, SharedGuardRegistry};
use portcullis_state::ChangeNotifier;

use crate::context::GuardContext;
use crate::error::Result;
use crate::route::{ResolvedRoute, RouteResolver};

/// How a navigation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Every guard continued.
    Allowed,

    /// A guard diverted the navigation here.
    Redirect(Location),

    /// A guard cancelled the navigation.
    Blocked,
}

impl NavigationOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, NavigationOutcome::Allowed)
    }
}

impl<C> From<GuardOutcome<C>> for NavigationOutcome {
    fn from(outcome: GuardOutcome<C>) -> Self {
        match outcome {
            GuardOutcome::Continue(_) => NavigationOutcome::Allowed,
            GuardOutcome::Redirect(location) => NavigationOutcome::Redirect(location),
            GuardOutcome::Block => NavigationOutcome::Blocked,
        }
    }
}

/// What a navigation will run, before any guard is looked up.
#[derive(Debug, Clone)]
pub struct NavigationPlan {
    pub route: ResolvedRoute,

    /// Global guards followed by the matched segments' middleware.
    pub guards: Vec<GuardRef<GuardContext>>,
}

impl NavigationPlan {
    /// Names of the named guards, in execution order.
    pub fn guard_names(&self) -> Vec<&str> {
        self.guards.iter().filter_map(GuardRef::name).collect()
    }
}

pub struct NavigationGuardCoordinator {
    routes: Arc<dyn RouteResolver>,
    registry: SharedGuardRegistry<GuardContext>,
    global: Vec<GuardRef<GuardContext>>,
    notifier: Arc<ChangeNotifier>,
}

impl NavigationGuardCoordinator {
    pub fn new(
        routes: Arc<dyn RouteResolver>,
        registry: SharedGuardRegistry<GuardContext>,
        notifier: Arc<ChangeNotifier>,
    ) -> Self {
        Self {
            routes,
            registry,
            global: Vec::new(),
            notifier,
        }
    }

    /// Guards that run in front of every navigation.
    pub fn with_global_guards<I, G>(mut self, guards: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GuardRef<GuardContext>>,
    {
        self.global = guards.into_iter().map(Into::into).collect();
        self
    }

    pub fn registry(&self) -> &SharedGuardRegistry<GuardContext> {
        &self.registry
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Resolve the target and list its guards.
    pub fn plan(&self, target: &Location, current: Option<&Location>) -> NavigationPlan {
        let route = self.routes.resolve(target, current);
        let mut guards = self.global.clone();
        guards.extend(route.middleware());
        NavigationPlan { route, guards }
    }

    fn pipeline(
        &self,
        guards: &[GuardRef<GuardContext>],
    ) -> Result<MiddlewarePipeline<GuardContext>> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        let resolved = registry.resolve(guards)?;
        Ok(MiddlewarePipeline::new(resolved))
    }

    /// Run the guards of a navigation from `current` to `target`.
    ///
    /// Fails when a guard name is not registered; in that case no guard runs.
    pub async fn resolve(
        &self,
        target: &Location,
        current: Option<&Location>,
    ) -> Result<NavigationOutcome> {
        let NavigationPlan { route, guards } = self.plan(target, current);
        let mut pipeline = self.pipeline(&guards)?;

        let ctx = GuardContext::new(
            route.location,
            current.cloned(),
            route.matched,
            Arc::clone(&self.notifier),
        );
        let key = ctx.actor().key();
        let target_path = ctx.target.path.clone();

        let outcome = NavigationOutcome::from(pipeline.pipe(ctx).await?);
        tracing::debug!(
            target_path = %target_path,
            guards = pipeline.len(),
            %key,
            ?outcome,
            "navigation resolved"
        );
        Ok(outcome)
    }

    /// True when every guard of the navigation continued.
    pub async fn is_allowed(&self, target: &Location, current: Option<&Location>) -> Result<bool> {
        Ok(self.resolve(target, current).await?.is_allowed())
    }
}

impl std::fmt::Debug for NavigationGuardCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationGuardCoordinator")
            .field("global", &self.global)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}
