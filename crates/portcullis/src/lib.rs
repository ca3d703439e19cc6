//! # Portcullis
//!
//! Role and permission state for one actor, kept reactive, plus the guards
//! that decide whether a navigation may proceed.
//!
//! ## Overview
//!
//! - **State**: roles (optionally with role-scoped permissions), global
//!   permissions, actor id and login flag. Every mutation rebuilds the actor
//!   view and bumps a [`VersionKey`].
//! - **Queries**: `has_role`, `can`, `owns`, `ability`, `can_and_owns`, all
//!   answered by the current view.
//! - **Navigation**: each route segment declares middleware and an access
//!   requirement. A navigation runs the guards of every matched segment in
//!   order and ends `Allowed`, `Redirect` or `Blocked`.
//! - **Events**: named events with JSON payloads, including `user:login`,
//!   `user:logout` and `user:login:change` on actor id transitions.
//!
//! ## Usage
//!
//! ```rust
//! use portcullis::{Access, AccessConfig, Location, NavigationOutcome};
//! use portcullis::router::{AccessRequirement, RouteRecord, RouteTable};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let routes = RouteTable::new(vec![
//!     RouteRecord::new("/login").name("login"),
//!     RouteRecord::new("/admin")
//!         .middleware("login")
//!         .middleware("access")
//!         .access(AccessRequirement::roles("Admin")),
//! ])?;
//!
//! let config = AccessConfig {
//!     router: true,
//!     login_route: Some(Location::new("/login")),
//!     ..AccessConfig::default()
//! };
//! let access = Access::builder().config(config).routes(routes).build()?;
//!
//! let outcome = access.resolve(&Location::new("/admin"), None).await?;
//! assert_eq!(
//!     outcome,
//!     NavigationOutcome::Redirect(Location::new("/login").with_query("redirect", "/admin"))
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Re-exports
//!
//! - `portcullis::core` - names, roles, locations, the decision contract
//! - `portcullis::state` - the reactive state container and event bus
//! - `portcullis::pipeline` - guards, the pipeline and the guard registry
//! - `portcullis::router` - route matching, built-in guards, the coordinator

pub mod access;
pub mod config;
pub mod error;

pub use access::{Access, AccessBuilder};
pub use config::AccessConfig;
pub use error::{AccessError, Result};

pub use async_trait::async_trait;
pub use portcullis_core::{
    Ability, AbilityOptions, ActorId, ActorView, Decide, Location, Names, RoleAndOwnsOptions,
    RoleAssignment, RoleSpec, StandardDecider, VersionKey,
};
pub use portcullis_pipeline::{async_guard_fn, guard_fn, Guard, GuardOutcome, GuardRef};
pub use portcullis_router::{GuardContext, NavigationOutcome};
pub use portcullis_state::{
    LoginInfo, PermissionState, StateChange, USER_LOGIN, USER_LOGIN_CHANGE, USER_LOGOUT,
};

pub use portcullis_core as core;
pub use portcullis_pipeline as pipeline;
pub use portcullis_router as router;
pub use portcullis_state as state;
