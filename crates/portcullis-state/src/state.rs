//! Permission state.
//!
//! [`PermissionState`] is the single source of truth for who the actor is and
//! what it holds. It is only ever replaced through [`crate::ChangeNotifier`],
//! which keeps the derived view in step with it.

use std::collections::BTreeSet;

use portcullis_core::{assign_roles, ActorId, Names, RoleAssignment, RoleSpec};
use serde::{Deserialize, Serialize};

/// Roles, permissions and identity of the current actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionState {
    pub roles: Vec<RoleAssignment>,
    pub permissions: BTreeSet<String>,
    pub actor_id: Option<ActorId>,
    pub logged_in: Option<bool>,
}

impl PermissionState {
    /// The state of an actor that has not logged in: one role, nothing else.
    pub fn guest(role: impl Into<String>) -> Self {
        Self {
            roles: vec![RoleAssignment::new(role)],
            permissions: BTreeSet::new(),
            actor_id: None,
            logged_in: None,
        }
    }

    /// Only an explicit `Some(true)` counts as logged in.
    pub fn is_logged_in(&self) -> bool {
        self.logged_in == Some(true)
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|r| r.role.as_str())
    }
}

/// A partial update of [`PermissionState`].
///
/// Fields left untouched keep their current value when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginInfo {
    roles: Option<Vec<RoleAssignment>>,
    permissions: Option<BTreeSet<String>>,
    actor_id: Option<Option<ActorId>>,
    logged_in: Option<Option<bool>>,
}

impl LoginInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roles(mut self, roles: impl Into<RoleSpec>) -> Self {
        self.roles = Some(assign_roles(roles.into(), None));
        self
    }

    pub fn permissions(mut self, permissions: impl Into<Names>) -> Self {
        self.permissions = Some(permissions.into().to_set());
        self
    }

    pub fn actor_id(mut self, id: impl Into<ActorId>) -> Self {
        self.actor_id = Some(Some(id.into()));
        self
    }

    pub fn clear_actor_id(mut self) -> Self {
        self.actor_id = Some(None);
        self
    }

    pub fn logged_in(mut self, logged_in: bool) -> Self {
        self.logged_in = Some(Some(logged_in));
        self
    }

    pub fn clear_logged_in(mut self) -> Self {
        self.logged_in = Some(None);
        self
    }

    /// Write the provided fields into `state`.
    pub fn apply_to(self, state: &mut PermissionState) {
        if let Some(roles) = self.roles {
            state.roles = roles;
        }
        if let Some(permissions) = self.permissions {
            state.permissions = permissions;
        }
        if let Some(actor_id) = self.actor_id {
            state.actor_id = actor_id;
        }
        if let Some(logged_in) = self.logged_in {
            state.logged_in = logged_in;
        }
    }
}
