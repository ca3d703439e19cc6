//! # Portcullis Core
//!
//! Pure primitives shared by every Portcullis crate: role assignments,
//! query names, navigation locations, version keys, and the contract between
//! the gate and the authorization decision function.
//!
//! This crate contains no locking, no async and no I/O.
//!
//! ## Key Types
//!
//! - [`RoleAssignment`] - A role, optionally carrying permissions scoped to it
//! - [`Names`] - The "one name or many names" input of every query
//! - [`Location`] - A navigation destination (path, optional name, query)
//! - [`VersionKey`] - Change-detection token bumped on every state mutation
//! - [`ActorView`] / [`Decide`] - The derived authorization view and its constructor
//!
//! ## Reference Decider
//!
//! [`StandardDecider`] builds an [`Actor`], a role/permission view where a
//! permission is granted either globally or through one of the actor's roles.

pub mod actor;
pub mod decide;
pub mod error;
pub mod location;
pub mod types;

pub use actor::{Ability, AbilityOptions, ActorView, Decide, RoleAndOwnsOptions};
pub use decide::{Actor, StandardDecider};
pub use error::{CoreError, Result};
pub use location::Location;
pub use types::{assign_roles, ActorId, Names, RoleAssignment, RoleSpec, VersionKey};

/// Default record field compared against the actor id by ownership checks.
pub const DEFAULT_FOREIGN_KEY: &str = "user_id";

/// Default role given to an actor that has not logged in.
pub const DEFAULT_GUEST_ROLE: &str = "Guest";
