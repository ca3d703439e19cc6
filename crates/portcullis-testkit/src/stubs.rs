//! Stub deciders and guards.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use portcullis::core::{
    Ability, AbilityOptions, ActorId, ActorView, Decide, Names, RoleAssignment, StandardDecider,
};
use portcullis::pipeline::{Guard, GuardOutcome};
use portcullis::{GuardContext, Location};
use serde_json::Value;

/// A view that answers every query the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedView(pub bool);

impl ActorView for FixedView {
    fn has_role(&self, _: &Names, _: bool) -> bool {
        self.0
    }

    fn can(&self, _: &Names, _: bool) -> bool {
        self.0
    }

    fn owns(&self, _: &Value, _: &str) -> bool {
        self.0
    }

    fn ability(&self, _: &Names, _: &Names, _: AbilityOptions) -> Ability {
        Ability {
            granted: self.0,
            ..Ability::denied()
        }
    }
}

/// Decider producing a [`FixedView`].
#[derive(Debug, Clone, Copy)]
pub struct FixedDecider(pub bool);

impl FixedDecider {
    pub fn allow_all() -> Self {
        Self(true)
    }

    pub fn deny_all() -> Self {
        Self(false)
    }
}

impl Decide for FixedDecider {
    fn decide(
        &self,
        _: &[RoleAssignment],
        _: &BTreeSet<String>,
        _: Option<&ActorId>,
    ) -> Arc<dyn ActorView> {
        Arc::new(FixedView(self.0))
    }
}

/// [`StandardDecider`] that counts how many views it built.
#[derive(Debug, Clone, Default)]
pub struct CountingDecider {
    calls: Arc<AtomicUsize>,
}

impl CountingDecider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Decide for CountingDecider {
    fn decide(
        &self,
        roles: &[RoleAssignment],
        permissions: &BTreeSet<String>,
        actor_id: Option<&ActorId>,
    ) -> Arc<dyn ActorView> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StandardDecider.decide(roles, permissions, actor_id)
    }
}

/// What a [`RecordingGuard`] returns.
#[derive(Debug, Clone)]
pub enum Scripted {
    Continue,
    Redirect(Location),
    Block,
}

/// A guard that appends its name to a shared log and returns a scripted outcome.
#[derive(Debug, Clone)]
pub struct RecordingGuard {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    outcome: Scripted,
}

impl RecordingGuard {
    pub fn new(
        name: impl Into<String>,
        log: &Arc<Mutex<Vec<String>>>,
        outcome: Scripted,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            log: Arc::clone(log),
            outcome,
        })
    }

    pub fn passing(name: impl Into<String>, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Self::new(name, log, Scripted::Continue)
    }
}

#[async_trait]
impl Guard<GuardContext> for RecordingGuard {
    async fn handle(&self, ctx: GuardContext) -> GuardOutcome<GuardContext> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(self.name.clone());
        match &self.outcome {
            Scripted::Continue => GuardOutcome::Continue(ctx),
            Scripted::Redirect(location) => GuardOutcome::Redirect(location.clone()),
            Scripted::Block => GuardOutcome::Block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portcullis::state::{ChangeNotifier, PermissionState};

    #[test]
    fn test_fixed_decider() {
        let view = FixedDecider::allow_all().decide(&[], &BTreeSet::new(), None);
        assert!(view.can(&Names::from("anything"), true));
        let view = FixedDecider::deny_all().decide(&[], &BTreeSet::new(), None);
        assert!(!view.has_role(&Names::from("Guest"), false));
    }

    #[test]
    fn test_counting_decider_counts_rebuilds() {
        let decider = CountingDecider::new();
        let notifier =
            ChangeNotifier::new(Arc::new(decider.clone()), PermissionState::guest("Guest"));
        assert_eq!(decider.calls(), 1);
        notifier.update(|_| {});
        notifier.update(|_| {});
        assert_eq!(decider.calls(), 3);
    }

    #[tokio::test]
    async fn test_recording_guard() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let guard = RecordingGuard::new("deny", &log, Scripted::Redirect(Location::new("/403")));
        let notifier = Arc::new(ChangeNotifier::new(
            Arc::new(StandardDecider),
            PermissionState::guest("Guest"),
        ));
        let ctx = GuardContext::new(Location::new("/x"), None, Vec::new(), notifier);

        let outcome = guard.handle(ctx).await;
        assert_eq!(outcome.redirect_target(), Some(&Location::new("/403")));
        assert_eq!(*log.lock().unwrap(), vec!["deny".to_string()]);
    }
}
