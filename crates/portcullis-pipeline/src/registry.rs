//! Guard registry: name → guard.
//!
//! The registry is created at setup and handed to whoever builds pipelines.
//! It only changes through [`GuardRegistry::register`] and
//! [`GuardRegistry::unregister`]; registering an existing name replaces the
//! previous guard, and the replacement is picked up by the next lookup.
//!
//! Share it as [`SharedGuardRegistry`]: lookups take the read lock,
//! (re-)registration takes the write lock.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{PipelineError, Result};
use crate::guard::{Guard, GuardRef};

/// A registry shared between setup code and the coordinator.
pub type SharedGuardRegistry<C> = Arc<RwLock<GuardRegistry<C>>>;

pub struct GuardRegistry<C> {
    guards: BTreeMap<String, Arc<dyn Guard<C>>>,
}

impl<C> GuardRegistry<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            guards: BTreeMap::new(),
        }
    }

    /// Wrap into a [`SharedGuardRegistry`].
    pub fn shared(self) -> SharedGuardRegistry<C> {
        Arc::new(RwLock::new(self))
    }

    /// Register `guard` under `name`, returning the guard it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        guard: Arc<dyn Guard<C>>,
    ) -> Option<Arc<dyn Guard<C>>> {
        let name = name.into();
        let previous = self.guards.insert(name.clone(), guard);
        if previous.is_some() {
            tracing::debug!(guard = %name, "guard re-registered, replacing the previous one");
        }
        previous
    }

    /// Remove a guard. Returns `true` if it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.guards.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Guard<C>>> {
        self.guards.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.guards.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.guards.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Resolve references into guards, keeping order and duplicates.
    ///
    /// Fails on the first name that is not registered.
    pub fn resolve(&self, refs: &[GuardRef<C>]) -> Result<Vec<Arc<dyn Guard<C>>>> {
        refs.iter()
            .map(|r| match r {
                GuardRef::Named(name) => self
                    .get(name)
                    .ok_or_else(|| PipelineError::UnknownGuard(name.clone())),
                GuardRef::Inline(guard) => Ok(Arc::clone(guard)),
            })
            .collect()
    }
}

impl<C> Default for GuardRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for GuardRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardRegistry")
            .field("names", &self.guards.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::{guard_fn, GuardOutcome};
    use crate::pipeline::MiddlewarePipeline;

    fn add(n: u32) -> Arc<dyn Guard<u32>> {
        guard_fn(move |x: u32| GuardOutcome::Continue(x + n))
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = GuardRegistry::new();
        assert!(registry.register("inc", add(1)).is_none());
        assert!(registry.register("inc", add(10)).is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister("inc"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolve_unknown_name_fails() {
        let registry = GuardRegistry::<u32>::new();
        let err = registry.resolve(&["nope".into()]).err();
        assert_eq!(err, Some(PipelineError::UnknownGuard("nope".to_string())));
    }

    #[tokio::test]
    async fn test_lookup_is_late() {
        let shared = GuardRegistry::new().shared();
        shared.write().unwrap().register("inc", add(1));

        let refs: Vec<GuardRef<u32>> = vec!["inc".into(), GuardRef::Inline(add(100)), "inc".into()];

        // Re-registering before resolution is what the next traversal sees.
        shared.write().unwrap().register("inc", add(10));
        let guards = shared.read().unwrap().resolve(&refs).unwrap();
        let mut pipeline = MiddlewarePipeline::new(guards);

        assert_eq!(pipeline.pipe(0).await, Ok(GuardOutcome::Continue(120)));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = GuardRegistry::new();
        registry.register("b", add(1));
        registry.register("a", add(1));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
