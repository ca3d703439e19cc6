//! Reference decision function.
//!
//! [`StandardDecider`] derives an [`Actor`]: roles are matched by name and a
//! permission is held when it is in the global set or scoped to any held
//! role. An empty query never grants anything.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;

use crate::actor::{Ability, AbilityOptions, ActorView, Decide};
use crate::types::{ActorId, Names, RoleAssignment};

/// The built-in [`Decide`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDecider;

impl Decide for StandardDecider {
    fn decide(
        &self,
        roles: &[RoleAssignment],
        permissions: &BTreeSet<String>,
        actor_id: Option<&ActorId>,
    ) -> Arc<dyn ActorView> {
        Arc::new(Actor::new(roles, permissions, actor_id.cloned()))
    }
}

/// A derived actor, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    roles: BTreeSet<String>,
    permissions: BTreeSet<String>,
    actor_id: Option<ActorId>,
}

impl Actor {
    pub fn new(
        roles: &[RoleAssignment],
        permissions: &BTreeSet<String>,
        actor_id: Option<ActorId>,
    ) -> Self {
        let mut effective = permissions.clone();
        for assignment in roles {
            if let Some(scoped) = &assignment.permissions {
                effective.extend(scoped.iter().cloned());
            }
        }

        Self {
            roles: roles.iter().map(|r| r.role.clone()).collect(),
            permissions: effective,
            actor_id,
        }
    }

    /// Effective permissions: global plus role-scoped.
    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn actor_id(&self) -> Option<&ActorId> {
        self.actor_id.as_ref()
    }
}

fn check(held: &BTreeSet<String>, wanted: &Names, require_all: bool) -> bool {
    if wanted.is_empty() {
        return false;
    }
    if require_all {
        wanted.iter().all(|name| held.contains(name))
    } else {
        wanted.iter().any(|name| held.contains(name))
    }
}

fn breakdown(held: &BTreeSet<String>, wanted: &Names) -> BTreeMap<String, bool> {
    wanted
        .iter()
        .map(|name| (name.to_string(), held.contains(name)))
        .collect()
}

impl ActorView for Actor {
    fn has_role(&self, roles: &Names, require_all: bool) -> bool {
        check(&self.roles, roles, require_all)
    }

    fn can(&self, permissions: &Names, require_all: bool) -> bool {
        check(&self.permissions, permissions, require_all)
    }

    fn owns(&self, record: &Value, foreign_key: &str) -> bool {
        match (&self.actor_id, record.get(foreign_key)) {
            (Some(id), Some(value)) => id.matches(value),
            _ => false,
        }
    }

    fn ability(&self, roles: &Names, permissions: &Names, options: AbilityOptions) -> Ability {
        let role_checks = breakdown(&self.roles, roles);
        let permission_checks = breakdown(&self.permissions, permissions);

        let mut verdicts = role_checks.values().chain(permission_checks.values());
        let granted = if role_checks.is_empty() && permission_checks.is_empty() {
            false
        } else if options.validate_all {
            verdicts.all(|held| *held)
        } else {
            verdicts.any(|held| *held)
        };

        Ability {
            granted,
            roles: role_checks,
            permissions: permission_checks,
        }
    }
}
