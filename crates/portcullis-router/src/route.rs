//! Destinations and their guard metadata.
//!
//! A destination is reached through a chain of nested route records. Every
//! record on the chain is a matched segment and contributes its own
//! middleware list and access requirement. [`RouteTable`] is a minimal
//! in-memory matcher (static segments, `:param` segments, a trailing `*`);
//! hosts with their own router implement [`RouteResolver`] instead.

use std::collections::{BTreeMap, HashSet};

use portcullis_core::{Location, Names};
use portcullis_pipeline::GuardRef;
use portcullis_state::ActorSnapshot;
use serde::{Deserialize, Serialize};

use crate::context::GuardContext;
use crate::error::{Result, RouterError};

/// Roles and permissions a destination segment demands.
///
/// An empty list imposes nothing. When both lists are given, both must pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirement {
    #[serde(default)]
    pub roles: Names,

    #[serde(default)]
    pub permissions: Names,

    /// Require every listed name instead of any one.
    #[serde(default)]
    pub require_all: bool,
}

impl AccessRequirement {
    pub fn roles(roles: impl Into<Names>) -> Self {
        Self {
            roles: roles.into(),
            ..Self::default()
        }
    }

    pub fn permissions(permissions: impl Into<Names>) -> Self {
        Self {
            permissions: permissions.into(),
            ..Self::default()
        }
    }

    pub fn with_permissions(mut self, permissions: impl Into<Names>) -> Self {
        self.permissions = permissions.into();
        self
    }

    pub fn require_all(mut self) -> Self {
        self.require_all = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.permissions.is_empty()
    }

    /// Check the requirement against a captured actor.
    pub fn is_satisfied_by(&self, actor: &ActorSnapshot) -> bool {
        let roles_ok = self.roles.is_empty() || actor.has_role(&self.roles, self.require_all);
        let permissions_ok =
            self.permissions.is_empty() || actor.can(&self.permissions, self.require_all);
        roles_ok && permissions_ok
    }
}

/// Guard metadata of one route record.
#[derive(Debug, Clone, Default)]
pub struct RouteMeta {
    /// Guards to run, in order.
    pub middleware: Vec<GuardRef<GuardContext>>,

    /// What the access guard checks for this segment.
    pub access: Option<AccessRequirement>,
}

/// A route record, possibly with nested children.
#[derive(Debug, Clone)]
pub struct RouteRecord {
    /// Absolute (`/admin`) or, for children, relative (`users`, `:id`).
    pub path: String,
    pub name: Option<String>,
    pub meta: RouteMeta,
    pub children: Vec<RouteRecord>,
}

impl RouteRecord {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            meta: RouteMeta::default(),
            children: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append one guard to this record's middleware.
    pub fn middleware(mut self, guard: impl Into<GuardRef<GuardContext>>) -> Self {
        self.meta.middleware.push(guard.into());
        self
    }

    pub fn access(mut self, requirement: AccessRequirement) -> Self {
        self.meta.access = Some(requirement);
        self
    }

    pub fn child(mut self, child: RouteRecord) -> Self {
        self.children.push(child);
        self
    }
}

/// One record on the matched chain, with its full path pattern.
#[derive(Debug, Clone)]
pub struct MatchedSegment {
    pub pattern: String,
    pub name: Option<String>,
    pub meta: RouteMeta,
}

/// The outcome of matching a navigation target.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    /// The normalised target.
    pub location: Location,

    /// Matched records, outermost first. Empty when nothing matched.
    pub matched: Vec<MatchedSegment>,

    /// Values captured by `:param` and `*` segments.
    pub params: BTreeMap<String, String>,
}

impl ResolvedRoute {
    /// A target that matched no record.
    pub fn unmatched(location: Location) -> Self {
        Self {
            location,
            matched: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    /// Middleware of every matched segment, outermost first, duplicates kept.
    pub fn middleware(&self) -> Vec<GuardRef<GuardContext>> {
        self.matched
            .iter()
            .flat_map(|segment| segment.meta.middleware.iter().cloned())
            .collect()
    }

    /// Access requirements of the matched segments, outermost first.
    pub fn requirements(&self) -> impl Iterator<Item = &AccessRequirement> {
        self.matched.iter().filter_map(|segment| segment.meta.access.as_ref())
    }
}

/// Resolves a navigation target into its matched segments.
pub trait RouteResolver: Send + Sync {
    fn resolve(&self, target: &Location, current: Option<&Location>) -> ResolvedRoute;
}

/// In-memory route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    records: Vec<RouteRecord>,
}

impl RouteTable {
    /// Build a table, checking that top-level paths are absolute and names unique.
    pub fn new(records: Vec<RouteRecord>) -> Result<Self> {
        let mut names = HashSet::new();
        for record in &records {
            if !record.path.starts_with('/') {
                return Err(RouterError::InvalidRoute {
                    path: record.path.clone(),
                    reason: "top-level route paths must start with '/'".to_string(),
                });
            }
            collect_names(record, &mut names)?;
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[RouteRecord] {
        &self.records
    }

    fn resolve_path(&self, path: &str) -> Option<(Vec<MatchedSegment>, BTreeMap<String, String>)> {
        let target: Vec<&str> = segments(path).collect();
        let mut params = BTreeMap::new();
        let chain = match_records(&self.records, "", &target, &mut params)?;
        Some((chain, params))
    }

    fn resolve_name(&self, name: &str) -> Option<Vec<MatchedSegment>> {
        find_named(&self.records, "", name)
    }
}

fn collect_names(record: &RouteRecord, names: &mut HashSet<String>) -> Result<()> {
    if let Some(name) = &record.name {
        if !names.insert(name.clone()) {
            return Err(RouterError::DuplicateRouteName(name.clone()));
        }
    }
    record
        .children
        .iter()
        .try_for_each(|child| collect_names(child, names))
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn join(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        child.to_string()
    } else if child.is_empty() {
        parent.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), child)
    }
}

fn segment_of(record: &RouteRecord, pattern: String) -> MatchedSegment {
    MatchedSegment {
        pattern,
        name: record.name.clone(),
        meta: record.meta.clone(),
    }
}

/// Match `pattern` against the start of `target`, returning how many target
/// segments it consumed.
fn match_prefix(
    pattern: &[&str],
    target: &[&str],
    params: &mut BTreeMap<String, String>,
) -> Option<usize> {
    for (i, part) in pattern.iter().enumerate() {
        if *part == "*" {
            params.insert("pathMatch".to_string(), target.get(i..).unwrap_or_default().join("/"));
            return Some(target.len());
        }
        let actual = target.get(i)?;
        match part.strip_prefix(':') {
            Some(param) => {
                params.insert(param.to_string(), actual.to_string());
            }
            None if part == actual => {}
            None => return None,
        }
    }
    Some(pattern.len())
}

fn match_records(
    records: &[RouteRecord],
    parent: &str,
    target: &[&str],
    params: &mut BTreeMap<String, String>,
) -> Option<Vec<MatchedSegment>> {
    for record in records {
        let full = join(parent, &record.path);
        let pattern: Vec<&str> = segments(&full).collect();

        let mut attempt = params.clone();
        let Some(consumed) = match_prefix(&pattern, target, &mut attempt) else {
            continue;
        };

        // Children first, so an empty child path wins over its parent.
        if let Some(rest) = match_records(&record.children, &full, target, &mut attempt) {
            let mut chain = vec![segment_of(record, full)];
            chain.extend(rest);
            *params = attempt;
            return Some(chain);
        }

        if consumed == target.len() {
            *params = attempt;
            return Some(vec![segment_of(record, full)]);
        }
    }
    None
}

fn find_named(records: &[RouteRecord], parent: &str, name: &str) -> Option<Vec<MatchedSegment>> {
    for record in records {
        let full = join(parent, &record.path);
        if record.name.as_deref() == Some(name) {
            return Some(vec![segment_of(record, full)]);
        }
        if let Some(rest) = find_named(&record.children, &full, name) {
            let mut chain = vec![segment_of(record, full)];
            chain.extend(rest);
            return Some(chain);
        }
    }
    None
}

impl RouteResolver for RouteTable {
    fn resolve(&self, target: &Location, current: Option<&Location>) -> ResolvedRoute {
        let mut location = target.clone();

        if location.path.is_empty() {
            if let Some(chain) = location.name.as_deref().and_then(|n| self.resolve_name(n)) {
                if let Some(last) = chain.last() {
                    location.path = last.pattern.clone();
                }
                return ResolvedRoute {
                    location,
                    matched: chain,
                    params: BTreeMap::new(),
                };
            }
            return ResolvedRoute::unmatched(location);
        }

        if !location.path.starts_with('/') {
            let base = current.map_or("/", |c| c.path.as_str());
            location.path = join(base, &location.path);
        }

        match self.resolve_path(&location.path) {
            Some((matched, params)) => {
                if location.name.is_none() {
                    location.name = matched.last().and_then(|s| s.name.clone());
                }
                ResolvedRoute {
                    location,
                    matched,
                    params,
                }
            }
            None => ResolvedRoute::unmatched(location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new(vec![
            RouteRecord::new("/").name("home"),
            RouteRecord::new("/login").name("login"),
            RouteRecord::new("/admin")
                .name("admin")
                .middleware("login")
                .access(AccessRequirement::roles("Admin"))
                .child(RouteRecord::new("").name("admin-index"))
                .child(
                    RouteRecord::new("users")
                        .middleware("access")
                        .child(RouteRecord::new(":id").name("admin-user").middleware("audit")),
                ),
            RouteRecord::new("/files/*").name("files"),
        ])
        .unwrap()
    }

    fn names(route: &ResolvedRoute) -> Vec<String> {
        route
            .middleware()
            .iter()
            .filter_map(|g| g.name().map(String::from))
            .collect()
    }

    #[test]
    fn test_static_match() {
        let route = table().resolve(&Location::new("/login"), None);
        assert_eq!(route.matched.len(), 1);
        assert_eq!(route.location.name.as_deref(), Some("login"));
    }

    #[test]
    fn test_nested_match_flattens_middleware_outermost_first() {
        let route = table().resolve(&Location::new("/admin/users/42"), None);
        let patterns: Vec<_> = route.matched.iter().map(|s| s.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["/admin", "/admin/users", "/admin/users/:id"]);
        assert_eq!(names(&route), vec!["login", "access", "audit"]);
        assert_eq!(route.params.get("id").map(String::as_str), Some("42"));
        assert_eq!(route.requirements().count(), 1);
    }

    #[test]
    fn test_empty_child_path_is_default_child() {
        let route = table().resolve(&Location::new("/admin"), None);
        assert_eq!(route.matched.len(), 2);
        assert_eq!(route.location.name.as_deref(), Some("admin-index"));
    }

    #[test]
    fn test_partial_match_is_unmatched() {
        let route = table().resolve(&Location::new("/admin/other"), None);
        assert!(route.matched.is_empty());
        assert!(route.middleware().is_empty());
    }

    #[test]
    fn test_wildcard_captures_rest() {
        let route = table().resolve(&Location::new("/files/a/b.txt"), None);
        assert_eq!(route.params.get("pathMatch").map(String::as_str), Some("a/b.txt"));
    }

    #[test]
    fn test_resolve_by_name() {
        let route = table().resolve(&Location::new("").named("admin-index"), None);
        assert_eq!(route.location.path, "/admin");
        assert_eq!(route.matched.len(), 2);
    }

    #[test]
    fn test_relative_path_appends_to_current() {
        let current = Location::new("/admin/users");
        let route = table().resolve(&Location::new("7"), Some(&current));
        assert_eq!(route.location.path, "/admin/users/7");
        assert_eq!(route.location.name.as_deref(), Some("admin-user"));
    }

    #[test]
    fn test_query_is_kept() {
        let route = table().resolve(&Location::new("/login").with_query("next", "/x"), None);
        assert_eq!(route.location.query_param("next"), Some("/x"));
    }

    #[test]
    fn test_table_rejects_relative_top_level_and_duplicate_names() {
        let relative = RouteTable::new(vec![RouteRecord::new("admin")]);
        assert!(matches!(relative, Err(RouterError::InvalidRoute { .. })));

        let duplicate = RouteTable::new(vec![
            RouteRecord::new("/a").name("x"),
            RouteRecord::new("/b").child(RouteRecord::new("c").name("x")),
        ]);
        assert_eq!(duplicate.err(), Some(RouterError::DuplicateRouteName("x".to_string())));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn wildcard_captures_any_tail(tail in prop::collection::vec("[a-z0-9.]{1,6}", 0..5)) {
                let path = format!("/files/{}", tail.join("/"));
                let route = table().resolve(&Location::new(path), None);
                prop_assert_eq!(route.matched.len(), 1);
                prop_assert_eq!(route.params.get("pathMatch").cloned(), Some(tail.join("/")));
            }

            #[test]
            fn user_id_param_is_captured(id in "[a-z0-9]{1,12}") {
                let route = table().resolve(&Location::new(format!("/admin/users/{id}")), None);
                prop_assert_eq!(route.middleware().len(), 3);
                prop_assert_eq!(route.params.get("id"), Some(&id));
            }
        }
    }
}
