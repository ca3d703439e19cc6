//! # Portcullis Testkit
//!
//! Testing utilities for Portcullis.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a standard route table and a configured [`AccessFixture`]
//! - **Generators**: proptest strategies for names, states and mutation sequences
//! - **Stubs**: fixed and counting deciders, and a guard that records its runs
//!
//! ## Test Fixtures
//!
//! ```rust
//! use portcullis_testkit::fixtures::AccessFixture;
//!
//! let fixture = AccessFixture::new();
//! fixture.login_as(1, "Admin");
//! assert!(fixture.access.has_role("Admin", false));
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use portcullis_testkit::generators::Mutation;
//!
//! proptest! {
//!     #[test]
//!     fn key_moves_on_every_mutation(
//!         mutations in prop::collection::vec(any::<Mutation>(), 1..16),
//!     ) {
//!         let fixture = AccessFixture::new();
//!         for m in &mutations {
//!             let before = fixture.access.key();
//!             prop_assert!(m.apply(&fixture.access) > before);
//!         }
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod stubs;

pub use fixtures::{init_tracing, standard_config, standard_routes, AccessFixture};
pub use generators::Mutation;
pub use stubs::{CountingDecider, FixedDecider, FixedView, RecordingGuard, Scripted};
