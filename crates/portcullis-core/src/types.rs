//! Strong type definitions for Portcullis.
//!
//! Identifiers and query inputs are newtypes so that a role name is never
//! confused with a permission list or an actor id at compile time.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Process-wide source of version keys.
static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Change-detection token regenerated on every permission-state mutation.
///
/// Keys are unique for the lifetime of the process and strictly increasing,
/// so a reader holding an old key can tell that the state moved on, even if
/// the new state carries identical values.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionKey(u64);

impl VersionKey {
    /// Allocate a fresh key.
    pub fn next() -> Self {
        Self(NEXT_VERSION.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionKey({})", self.0)
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "portcullis-{}", self.0)
    }
}

/// Identifier of the current actor.
///
/// Stored as a string; numeric ids are kept in their decimal form so that
/// records carrying either `"42"` or `42` are recognised as owned.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a record field holds this id.
    pub fn matches(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => s == &self.0,
            Value::Number(n) => n.to_string() == self.0,
            _ => false,
        }
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ActorId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// One name or a list of names, as accepted by every query.
///
/// A single string may hold several names separated by `|`
/// (`"admin|editor"`). Whitespace around names is trimmed and empty names are
/// dropped; order is preserved and duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NamesRepr", into = "Vec<String>")]
pub struct Names(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum NamesRepr {
    One(String),
    Many(Vec<String>),
}

impl From<NamesRepr> for Names {
    fn from(repr: NamesRepr) -> Self {
        match repr {
            NamesRepr::One(s) => Names::from(s.as_str()),
            NamesRepr::Many(v) => Names::from(v),
        }
    }
}

impl From<Names> for Vec<String> {
    fn from(names: Names) -> Self {
        names.0
    }
}

impl Names {
    /// An empty name list.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Collect into a set, dropping duplicates.
    pub fn to_set(&self) -> BTreeSet<String> {
        self.0.iter().cloned().collect()
    }

    fn push_split(&mut self, raw: &str) {
        self.0.extend(
            raw.split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        );
    }
}

impl From<&str> for Names {
    fn from(raw: &str) -> Self {
        let mut names = Names::empty();
        names.push_split(raw);
        names
    }
}

impl From<String> for Names {
    fn from(raw: String) -> Self {
        Names::from(raw.as_str())
    }
}

impl From<&String> for Names {
    fn from(raw: &String) -> Self {
        Names::from(raw.as_str())
    }
}

impl<S: AsRef<str>> From<Vec<S>> for Names {
    fn from(items: Vec<S>) -> Self {
        let mut names = Names::empty();
        for item in &items {
            names.push_split(item.as_ref());
        }
        names
    }
}

impl<S: AsRef<str>> From<&[S]> for Names {
    fn from(items: &[S]) -> Self {
        let mut names = Names::empty();
        for item in items {
            names.push_split(item.as_ref());
        }
        names
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for Names {
    fn from(items: [S; N]) -> Self {
        Names::from(&items[..])
    }
}

impl From<&BTreeSet<String>> for Names {
    fn from(items: &BTreeSet<String>) -> Self {
        Self(items.iter().cloned().collect())
    }
}

impl<'a> IntoIterator for &'a Names {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A role held by the actor.
///
/// A role may carry permissions scoped to it, in addition to the actor's
/// global permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<String>>,
}

impl RoleAssignment {
    /// A role without scoped permissions.
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            permissions: None,
        }
    }

    /// Attach scoped permissions to this role.
    pub fn with_permissions(mut self, permissions: impl Into<Names>) -> Self {
        self.permissions = Some(permissions.into().to_set());
        self
    }
}

/// Role input accepted by the role setters.
///
/// Either plain role names or fully formed assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSpec {
    Names(Names),
    Assignments(Vec<RoleAssignment>),
}

impl RoleSpec {
    /// True when this is exactly one role given by name.
    pub fn is_single_name(&self) -> bool {
        matches!(self, RoleSpec::Names(names) if names.len() == 1)
    }
}

impl From<&str> for RoleSpec {
    fn from(raw: &str) -> Self {
        RoleSpec::Names(Names::from(raw))
    }
}

impl From<String> for RoleSpec {
    fn from(raw: String) -> Self {
        RoleSpec::Names(Names::from(raw))
    }
}

impl From<Names> for RoleSpec {
    fn from(names: Names) -> Self {
        RoleSpec::Names(names)
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for RoleSpec {
    fn from(items: [S; N]) -> Self {
        RoleSpec::Names(Names::from(items))
    }
}

impl<S: AsRef<str>> From<&[S]> for RoleSpec {
    fn from(items: &[S]) -> Self {
        RoleSpec::Names(Names::from(items))
    }
}

impl From<Vec<&str>> for RoleSpec {
    fn from(items: Vec<&str>) -> Self {
        RoleSpec::Names(Names::from(items))
    }
}

impl From<RoleAssignment> for RoleSpec {
    fn from(assignment: RoleAssignment) -> Self {
        RoleSpec::Assignments(vec![assignment])
    }
}

impl From<Vec<RoleAssignment>> for RoleSpec {
    fn from(assignments: Vec<RoleAssignment>) -> Self {
        RoleSpec::Assignments(assignments)
    }
}

/// Normalise a role input into assignments.
///
/// Named roles receive `permissions` as their scoped permissions; explicit
/// assignments are kept as given.
pub fn assign_roles(spec: RoleSpec, permissions: Option<&Names>) -> Vec<RoleAssignment> {
    match spec {
        RoleSpec::Names(names) => names
            .iter()
            .map(|name| {
                let assignment = RoleAssignment::new(name);
                match permissions {
                    Some(perms) => assignment.with_permissions(perms.clone()),
                    None => assignment,
                }
            })
            .collect(),
        RoleSpec::Assignments(assignments) => assignments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_keys_strictly_increase() {
        let a = VersionKey::next();
        let b = VersionKey::next();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_version_key_display() {
        let key = VersionKey(7);
        assert_eq!(key.to_string(), "portcullis-7");
    }

    #[test]
    fn test_names_split_on_pipe() {
        let names = Names::from("admin| editor||");
        assert_eq!(names.iter().collect::<Vec<_>>(), vec!["admin", "editor"]);
    }

    #[test]
    fn test_names_from_array_keeps_order_and_duplicates() {
        let names = Names::from(["b", "a", "b"]);
        assert_eq!(names.iter().collect::<Vec<_>>(), vec!["b", "a", "b"]);
        assert_eq!(names.to_set().len(), 2);
    }

    #[test]
    fn test_names_deserialize_string_or_list() {
        let one: Names = serde_json::from_value(json!("a|b")).unwrap();
        let many: Names = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(one, many);
    }

    #[test]
    fn test_actor_id_matches_string_and_number() {
        let id = ActorId::from(42u64);
        assert!(id.matches(&json!(42)));
        assert!(id.matches(&json!("42")));
        assert!(!id.matches(&json!(43)));
        assert!(!id.matches(&json!(null)));
    }

    #[test]
    fn test_assign_roles_attaches_permissions_to_names() {
        let perms = Names::from(["post.edit"]);
        let roles = assign_roles(RoleSpec::from("Editor"), Some(&perms));
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].role, "Editor");
        assert!(roles[0].permissions.as_ref().unwrap().contains("post.edit"));
    }

    #[test]
    fn test_assign_roles_keeps_explicit_assignments() {
        let explicit = RoleAssignment::new("Admin").with_permissions(["all"]);
        let roles = assign_roles(RoleSpec::from(explicit.clone()), Some(&Names::from("x")));
        assert_eq!(roles, vec![explicit]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn version_keys_never_repeat(count in 1usize..64) {
                let keys: Vec<VersionKey> = (0..count).map(|_| VersionKey::next()).collect();
                prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
            }

            #[test]
            fn piped_string_matches_list(names in prop::collection::vec("[A-Za-z.]{1,8}", 0..6)) {
                let piped = Names::from(names.join("|"));
                let listed = Names::from(names.clone());
                prop_assert_eq!(&piped, &listed);
                let expected: Vec<&str> = names.iter().map(String::as_str).collect();
                prop_assert_eq!(piped.iter().collect::<Vec<_>>(), expected);
            }

            #[test]
            fn blank_names_are_dropped(raw in "[a-z |]{0,24}") {
                let names = Names::from(raw.as_str());
                for name in names.iter() {
                    prop_assert!(!name.is_empty());
                    prop_assert_eq!(name.trim(), name);
                    prop_assert!(!name.contains('|'));
                }
            }
        }
    }
}
