//! Guards and their outcomes.
//!
//! A guard receives the context of one traversal and returns what the
//! pipeline does next. It advances the chain by returning
//! [`GuardOutcome::Continue`] with the (possibly modified) context; any other
//! outcome ends the traversal. Since a guard returns exactly one outcome, it
//! can advance the chain by one step at most.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use portcullis_core::Location;

/// What a guard wants the pipeline to do.
///
/// `Default` is not implemented: a guard must decide explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<C> {
    /// Hand the context to the next guard.
    Continue(C),

    /// Divert the navigation to another location.
    Redirect(Location),

    /// Stop the navigation where it is.
    Block,
}

impl<C> GuardOutcome<C> {
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect(_))
    }

    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block)
    }

    /// The redirect target, if this is a redirect.
    pub fn redirect_target(&self) -> Option<&Location> {
        match self {
            Self::Redirect(location) => Some(location),
            _ => None,
        }
    }
}

/// A step in a pipeline.
///
/// Guards may await external checks; the pipeline awaits each guard before
/// dispatching the next one. A guard that never completes stalls the
/// traversal, there is no timeout.
#[async_trait]
pub trait Guard<C>: Send + Sync {
    async fn handle(&self, ctx: C) -> GuardOutcome<C>;
}

/// Adapter for synchronous closures.
pub struct FnGuard<F>(F);

#[async_trait]
impl<C, F> Guard<C> for FnGuard<F>
where
    C: Send + 'static,
    F: Fn(C) -> GuardOutcome<C> + Send + Sync,
{
    async fn handle(&self, ctx: C) -> GuardOutcome<C> {
        (self.0)(ctx)
    }
}

/// Adapter for closures returning a future.
pub struct AsyncFnGuard<F>(F);

#[async_trait]
impl<C, F, Fut> Guard<C> for AsyncFnGuard<F>
where
    C: Send + 'static,
    F: Fn(C) -> Fut + Send + Sync,
    Fut: Future<Output = GuardOutcome<C>> + Send + 'static,
{
    async fn handle(&self, ctx: C) -> GuardOutcome<C> {
        (self.0)(ctx).await
    }
}

/// Wrap a synchronous closure as a guard.
pub fn guard_fn<C, F>(f: F) -> Arc<dyn Guard<C>>
where
    C: Send + 'static,
    F: Fn(C) -> GuardOutcome<C> + Send + Sync + 'static,
{
    Arc::new(FnGuard(f))
}

/// Wrap a future-returning closure as a guard.
pub fn async_guard_fn<C, F, Fut>(f: F) -> Arc<dyn Guard<C>>
where
    C: Send + 'static,
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GuardOutcome<C>> + Send + 'static,
{
    Arc::new(AsyncFnGuard(f))
}

/// A guard as declared on a destination.
///
/// Named guards are looked up in the registry when the pipeline is built for
/// a navigation, so the most recently registered implementation is used.
pub enum GuardRef<C> {
    Named(String),
    Inline(Arc<dyn Guard<C>>),
}

impl<C> GuardRef<C> {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// The registry name, if this is a named reference.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Inline(_) => None,
        }
    }
}

impl<C> Clone for GuardRef<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Named(name) => Self::Named(name.clone()),
            Self::Inline(guard) => Self::Inline(Arc::clone(guard)),
        }
    }
}

impl<C> fmt::Debug for GuardRef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "GuardRef::Named({name})"),
            Self::Inline(_) => f.write_str("GuardRef::Inline(..)"),
        }
    }
}

impl<C> From<&str> for GuardRef<C> {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl<C> From<String> for GuardRef<C> {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl<C> From<Arc<dyn Guard<C>>> for GuardRef<C> {
    fn from(guard: Arc<dyn Guard<C>>) -> Self {
        Self::Inline(guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_guard_passes_context_through() {
        let guard = guard_fn(|n: u32| GuardOutcome::Continue(n + 1));
        assert_eq!(guard.handle(1).await, GuardOutcome::Continue(2));
    }

    #[tokio::test]
    async fn test_async_guard_awaits() {
        let guard = async_guard_fn(|n: u32| async move {
            tokio::task::yield_now().await;
            if n > 10 {
                GuardOutcome::Block
            } else {
                GuardOutcome::Continue(n)
            }
        });
        assert!(guard.handle(11).await.is_block());
        assert!(guard.handle(3).await.is_continue());
    }

    #[test]
    fn test_outcome_helpers() {
        let redirect: GuardOutcome<()> = GuardOutcome::Redirect(Location::new("/403"));
        assert!(redirect.is_redirect());
        assert_eq!(redirect.redirect_target().map(|l| l.path.as_str()), Some("/403"));
        assert!(GuardOutcome::<()>::Block.redirect_target().is_none());
    }

    #[test]
    fn test_guard_ref_names() {
        let named: GuardRef<()> = "login".into();
        assert_eq!(named.name(), Some("login"));
        let inline: GuardRef<()> = GuardRef::Inline(guard_fn(GuardOutcome::Continue));
        assert_eq!(inline.name(), None);
        assert_eq!(format!("{:?}", inline.clone()), "GuardRef::Inline(..)");
    }
}
