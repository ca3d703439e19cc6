//! # Portcullis Pipeline
//!
//! A sequential continuation chain of guards, generic over the context the
//! guards pass along.
//!
//! ## Overview
//!
//! - [`Guard`] - one step; returns a [`GuardOutcome`]
//! - [`MiddlewarePipeline`] - runs guards in order, single traversal per instance
//! - [`GuardRegistry`] - guards registered by name, looked up late
//! - [`GuardRef`] - a guard as declared on a destination: by name or inline
//!
//! ## Usage
//!
//! ```rust
//! use portcullis_pipeline::{guard_fn, GuardOutcome, MiddlewarePipeline};
//!
//! # async fn example() {
//! let double = guard_fn(|n: u32| GuardOutcome::Continue(n * 2));
//! let cap = guard_fn(|n: u32| {
//!     if n > 10 {
//!         GuardOutcome::Block
//!     } else {
//!         GuardOutcome::Continue(n)
//!     }
//! });
//!
//! let mut pipeline = MiddlewarePipeline::new(vec![double, cap]);
//! assert_eq!(pipeline.pipe(3).await.unwrap(), GuardOutcome::Continue(6));
//!
//! // One traversal per instance; rebuild for another.
//! let mut again = pipeline.rebuild();
//! assert!(again.pipe(8).await.unwrap().is_block());
//! # }
//! ```

pub mod error;
pub mod guard;
pub mod pipeline;
pub mod registry;

pub use error::{PipelineError, Result};
pub use guard::{async_guard_fn, guard_fn, AsyncFnGuard, FnGuard, Guard, GuardOutcome, GuardRef};
pub use pipeline::MiddlewarePipeline;
pub use registry::{GuardRegistry, SharedGuardRegistry};
