//! # Portcullis Router
//!
//! Navigation access control: decides whether a navigation may proceed,
//! should be redirected, or is blocked.
//!
//! ## Overview
//!
//! - [`RouteTable`] / [`RouteResolver`] - resolve a target into matched segments
//! - [`RouteMeta`] - per-segment middleware and [`AccessRequirement`]
//! - [`GuardContext`] - what guards see, including a version-keyed actor snapshot
//! - [`LoginGuard`] and [`RoleGuard`] - the built-in guards
//! - [`NavigationGuardCoordinator`] - runs one pipeline per navigation
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use portcullis_core::{Location, StandardDecider};
//! use portcullis_pipeline::GuardRegistry;
//! use portcullis_router::{
//!     register_builtin_guards, AccessRequirement, GuardSettings, NavigationGuardCoordinator,
//!     NavigationOutcome, RouteRecord, RouteTable,
//! };
//! use portcullis_state::{ChangeNotifier, PermissionState};
//!
//! # async fn example() -> portcullis_router::Result<()> {
//! let routes = RouteTable::new(vec![RouteRecord::new("/admin")
//!     .middleware("access")
//!     .access(AccessRequirement::roles("Admin"))])?;
//!
//! let mut registry = GuardRegistry::new();
//! register_builtin_guards(&mut registry, &GuardSettings::default());
//!
//! let notifier = Arc::new(ChangeNotifier::new(
//!     Arc::new(StandardDecider),
//!     PermissionState::guest("Guest"),
//! ));
//! let coordinator =
//!     NavigationGuardCoordinator::new(Arc::new(routes), registry.shared(), notifier);
//!
//! let outcome = coordinator.resolve(&Location::new("/admin"), None).await?;
//! assert_eq!(outcome, NavigationOutcome::Blocked);
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod coordinator;
pub mod error;
pub mod guards;
pub mod route;

pub use context::GuardContext;
pub use coordinator::{NavigationGuardCoordinator, NavigationOutcome, NavigationPlan};
pub use error::{Result, RouterError};
pub use guards::{
    register_builtin_guards, GuardSettings, GuardState, LoginGuard, RoleGuard, REDIRECT_QUERY_KEY,
};
pub use route::{
    AccessRequirement, MatchedSegment, ResolvedRoute, RouteMeta, RouteRecord, RouteResolver,
    RouteTable,
};
