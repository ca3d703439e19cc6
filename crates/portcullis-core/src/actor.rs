//! The authorization view and the decision function that builds it.
//!
//! Portcullis never decides on its own whether a role or permission is held.
//! It asks an [`ActorView`], which a [`Decide`] implementation derives from
//! the current roles, permissions and actor id. A new view is derived every
//! time that state is replaced.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ActorId, Names, RoleAssignment};
use crate::DEFAULT_FOREIGN_KEY;

/// Read-only authorization queries over one derived actor.
pub trait ActorView: Send + Sync + fmt::Debug {
    /// Check roles. With `require_all` every name must be held, otherwise any.
    fn has_role(&self, roles: &Names, require_all: bool) -> bool;

    /// Check permissions. With `require_all` every name must be held, otherwise any.
    fn can(&self, permissions: &Names, require_all: bool) -> bool;

    /// Check whether `record[foreign_key]` is this actor's id.
    fn owns(&self, record: &Value, foreign_key: &str) -> bool;

    /// Combined role and permission check with a per-item breakdown.
    fn ability(&self, roles: &Names, permissions: &Names, options: AbilityOptions) -> Ability;

    /// Permission check plus ownership of `record`.
    fn can_and_owns(
        &self,
        permissions: &Names,
        record: &Value,
        options: &RoleAndOwnsOptions,
    ) -> bool {
        self.can(permissions, options.require_all) && self.owns(record, &options.foreign_key_name)
    }
}

/// Constructor of [`ActorView`]s.
pub trait Decide: Send + Sync {
    fn decide(
        &self,
        roles: &[RoleAssignment],
        permissions: &BTreeSet<String>,
        actor_id: Option<&ActorId>,
    ) -> Arc<dyn ActorView>;
}

impl<F> Decide for F
where
    F: Fn(&[RoleAssignment], &BTreeSet<String>, Option<&ActorId>) -> Arc<dyn ActorView>
        + Send
        + Sync,
{
    fn decide(
        &self,
        roles: &[RoleAssignment],
        permissions: &BTreeSet<String>,
        actor_id: Option<&ActorId>,
    ) -> Arc<dyn ActorView> {
        self(roles, permissions, actor_id)
    }
}

/// Options for [`ActorView::ability`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityOptions {
    /// Require every role and every permission, instead of any one of them.
    pub validate_all: bool,
}

impl AbilityOptions {
    pub fn all() -> Self {
        Self { validate_all: true }
    }
}

/// Options for [`ActorView::can_and_owns`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAndOwnsOptions {
    pub require_all: bool,
    pub foreign_key_name: String,
}

impl Default for RoleAndOwnsOptions {
    fn default() -> Self {
        Self {
            require_all: false,
            foreign_key_name: DEFAULT_FOREIGN_KEY.to_string(),
        }
    }
}

/// Result of an ability check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    /// Overall verdict under the requested validation mode.
    pub granted: bool,

    /// Per-role verdicts.
    pub roles: BTreeMap<String, bool>,

    /// Per-permission verdicts.
    pub permissions: BTreeMap<String, bool>,
}

impl Ability {
    /// The verdict for an undecided actor: nothing granted.
    pub fn denied() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fixed(bool);

    impl ActorView for Fixed {
        fn has_role(&self, _: &Names, _: bool) -> bool {
            self.0
        }
        fn can(&self, _: &Names, _: bool) -> bool {
            self.0
        }
        fn owns(&self, record: &Value, key: &str) -> bool {
            record.get(key).is_some()
        }
        fn ability(&self, _: &Names, _: &Names, _: AbilityOptions) -> Ability {
            Ability::denied()
        }
    }

    #[test]
    fn test_can_and_owns_default_requires_both() {
        let record = serde_json::json!({ "user_id": 1 });
        let options = RoleAndOwnsOptions::default();

        assert!(Fixed(true).can_and_owns(&Names::from("x"), &record, &options));
        assert!(!Fixed(false).can_and_owns(&Names::from("x"), &record, &options));
        assert!(!Fixed(true).can_and_owns(&Names::from("x"), &serde_json::json!({}), &options));
    }

    #[test]
    fn test_closure_is_a_decider() {
        let decide = |_: &[RoleAssignment], _: &BTreeSet<String>, _: Option<&ActorId>| {
            Arc::new(Fixed(true)) as Arc<dyn ActorView>
        };
        let view = decide.decide(&[], &BTreeSet::new(), None);
        assert!(view.has_role(&Names::from("any"), false));
    }
}
