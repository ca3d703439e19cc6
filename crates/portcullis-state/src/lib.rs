//! # Portcullis State
//!
//! The reactive permission-state container.
//!
//! ## Overview
//!
//! - [`PermissionState`] holds roles, permissions, actor id and login flag.
//! - [`ChangeNotifier`] owns that state together with the [`ActorView`]
//!   derived from it and the current [`VersionKey`]. Every mutation replaces
//!   all three atomically and then notifies subscribers.
//! - [`ActorSnapshot`] is a consistent capture of view and key, handed to
//!   guards so they can detect that the state moved on while they waited.
//! - [`EventBus`] is the outward, string-named event surface.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use portcullis_core::{Names, RoleAssignment, StandardDecider};
//! use portcullis_state::{ChangeNotifier, PermissionState};
//!
//! let notifier = ChangeNotifier::new(Arc::new(StandardDecider), PermissionState::guest("Guest"));
//! let before = notifier.key();
//!
//! notifier.update(|state| state.roles = vec![RoleAssignment::new("Admin")]);
//!
//! assert!(notifier.is_stale(before));
//! assert!(notifier.snapshot().has_role(&Names::from("Admin"), false));
//! ```
//!
//! [`ActorView`]: portcullis_core::ActorView
//! [`VersionKey`]: portcullis_core::VersionKey

pub mod events;
pub mod notifier;
pub mod state;

pub use events::{EventBus, HandlerId, USER_LOGIN, USER_LOGIN_CHANGE, USER_LOGOUT};
pub use notifier::{ActorSnapshot, ChangeNotifier, StateChange, SubscriptionId};
pub use state::{LoginInfo, PermissionState};
