//! The context threaded through a navigation's guards.

use std::sync::Arc;

use portcullis_core::Location;
use portcullis_state::{ActorSnapshot, ChangeNotifier};
use serde_json::Value;

use crate::route::{AccessRequirement, MatchedSegment};

/// Everything a guard may consult for one navigation.
///
/// The actor snapshot is captured once, when the navigation starts. A guard
/// that awaits something can call [`GuardContext::is_stale`] afterwards to
/// find out whether the permission state changed in the meantime.
#[derive(Debug, Clone)]
pub struct GuardContext {
    /// Where the navigation is going.
    pub target: Location,

    /// Where it comes from, if anywhere.
    pub current: Option<Location>,

    /// Matched segments of the target, outermost first.
    pub matched: Vec<MatchedSegment>,

    /// Value handed forward by an earlier guard.
    pub carry: Option<Value>,

    actor: ActorSnapshot,
    notifier: Arc<ChangeNotifier>,
}

impl GuardContext {
    pub fn new(
        target: Location,
        current: Option<Location>,
        matched: Vec<MatchedSegment>,
        notifier: Arc<ChangeNotifier>,
    ) -> Self {
        Self {
            target,
            current,
            matched,
            carry: None,
            actor: notifier.snapshot(),
            notifier,
        }
    }

    /// The actor as it was when the navigation started.
    pub fn actor(&self) -> &ActorSnapshot {
        &self.actor
    }

    /// True when the permission state changed after this context was built.
    pub fn is_stale(&self) -> bool {
        self.notifier.is_stale(self.actor.key())
    }

    /// A fresh snapshot of the live state.
    pub fn refresh(mut self) -> Self {
        self.actor = self.notifier.snapshot();
        self
    }

    /// Hand a value to the next guards.
    pub fn with_carry(mut self, value: Value) -> Self {
        self.carry = Some(value);
        self
    }

    /// Access requirements declared along the matched chain.
    pub fn requirements(&self) -> impl Iterator<Item = &AccessRequirement> {
        self.matched.iter().filter_map(|segment| segment.meta.access.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portcullis_core::{Names, RoleAssignment, StandardDecider};
    use portcullis_state::PermissionState;
    use serde_json::json;

    fn notifier() -> Arc<ChangeNotifier> {
        Arc::new(ChangeNotifier::new(
            Arc::new(StandardDecider),
            PermissionState::guest("Guest"),
        ))
    }

    #[test]
    fn test_staleness_and_refresh() {
        let n = notifier();
        let ctx = GuardContext::new(Location::new("/"), None, Vec::new(), Arc::clone(&n));
        assert!(!ctx.is_stale());

        n.update(|s| s.roles = vec![RoleAssignment::new("Admin")]);
        assert!(ctx.is_stale());
        assert!(!ctx.actor().has_role(&Names::from("Admin"), false));

        let ctx = ctx.refresh();
        assert!(!ctx.is_stale());
        assert!(ctx.actor().has_role(&Names::from("Admin"), false));
    }

    #[test]
    fn test_carry() {
        let ctx = GuardContext::new(Location::new("/"), None, Vec::new(), notifier())
            .with_carry(json!({ "checked": true }));
        assert_eq!(ctx.carry, Some(json!({ "checked": true })));
    }
}
