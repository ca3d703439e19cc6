//! Proptest generators for property-based testing.

use proptest::prelude::*;

use portcullis::{Access, ActorId, LoginInfo, Location, RoleAssignment, VersionKey};
use portcullis::state::PermissionState;

/// Generate a role name.
pub fn role_name() -> impl Strategy<Value = String> + Clone {
    "[A-Z][a-z]{2,8}".prop_map(String::from)
}

/// Generate a dotted permission name.
pub fn permission_name() -> impl Strategy<Value = String> + Clone {
    "[a-z]{2,6}\\.[a-z]{2,6}".prop_map(String::from)
}

/// Generate a numeric actor id.
pub fn actor_id() -> impl Strategy<Value = u64> + Clone {
    1u64..10_000
}

/// Generate a role, sometimes with scoped permissions.
pub fn role_assignment() -> impl Strategy<Value = RoleAssignment> {
    (
        role_name(),
        prop::option::of(prop::collection::vec(permission_name(), 0..4)),
    )
        .prop_map(|(role, permissions)| match permissions {
            Some(permissions) => RoleAssignment::new(role).with_permissions(permissions),
            None => RoleAssignment::new(role),
        })
}

/// Generate a full permission state.
pub fn permission_state() -> impl Strategy<Value = PermissionState> {
    (
        prop::collection::vec(role_assignment(), 0..4),
        prop::collection::btree_set(permission_name(), 0..6),
        prop::option::of(actor_id()),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(roles, permissions, actor_id, logged_in)| PermissionState {
            roles,
            permissions,
            actor_id: actor_id.map(ActorId::from),
            logged_in,
        })
}

/// Generate an absolute location with a small query.
///
/// Query values may contain `/`, `?`, `&`, `=` and spaces.
pub fn location() -> impl Strategy<Value = Location> {
    (
        prop::collection::vec("[a-z]{1,8}", 0..4),
        prop::collection::btree_map("[a-z]{1,5}", "[a-z0-9/?&= ]{0,8}", 0..3),
    )
        .prop_map(|(segments, query)| Location {
            path: format!("/{}", segments.join("/")),
            name: None,
            query,
        })
}

/// One state mutation, as issued through [`Access`].
#[derive(Debug, Clone)]
pub enum Mutation {
    SetRole(Vec<String>),
    SetRoleWithPermissions(String, Vec<String>),
    AppendRole(Vec<String>),
    SetPermission(Vec<String>),
    AppendPermission(Vec<String>),
    Login { actor_id: u64, roles: Vec<String> },
    Reset,
}

impl Mutation {
    /// Apply to `access`, returning the new key.
    pub fn apply<E>(&self, access: &Access<E>) -> VersionKey {
        match self {
            Mutation::SetRole(roles) => access.set_role(roles.as_slice()),
            Mutation::SetRoleWithPermissions(role, permissions) => {
                access.set_role_with_permissions(role.as_str(), permissions.as_slice())
            }
            Mutation::AppendRole(roles) => access.append_role(roles.as_slice()),
            Mutation::SetPermission(permissions) => access.set_permission(permissions.as_slice()),
            Mutation::AppendPermission(permissions) => {
                access.append_permission(permissions.as_slice())
            }
            Mutation::Login { actor_id, roles } => access.set_login_user_info(
                LoginInfo::new()
                    .roles(roles.as_slice())
                    .actor_id(*actor_id)
                    .logged_in(true),
            ),
            Mutation::Reset => access.reset(),
        }
    }
}

impl Arbitrary for Mutation {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        let roles = prop::collection::vec(role_name(), 0..3);
        let permissions = prop::collection::vec(permission_name(), 0..4);
        prop_oneof![
            roles.clone().prop_map(Mutation::SetRole),
            (role_name(), permissions.clone())
                .prop_map(|(role, perms)| Mutation::SetRoleWithPermissions(role, perms)),
            roles.clone().prop_map(Mutation::AppendRole),
            permissions.clone().prop_map(Mutation::SetPermission),
            permissions.prop_map(Mutation::AppendPermission),
            (actor_id(), roles).prop_map(|(actor_id, roles)| Mutation::Login { actor_id, roles }),
            Just(Mutation::Reset),
        ]
        .boxed()
    }
}
