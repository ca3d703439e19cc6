//! Change notification and actor view derivation.
//!
//! [`ChangeNotifier`] owns the [`PermissionState`], the [`ActorView`] derived
//! from it and the current [`VersionKey`]. Every mutation replaces all three
//! under one write lock, so a reader never sees roles from one state next to
//! permissions or a view from another. Subscribers run after the lock is
//! released and may read or mutate the notifier again.
//!
//! Changes are queued in key order while the write lock is held and then
//! delivered by whichever caller finds the queue idle. Concurrent writers
//! therefore never deliver an older change after a newer one. A caller whose
//! change is picked up by another thread's delivery loop returns before its
//! subscribers have run.
//!
//! A view is rebuilt on every mutation, even one that writes identical
//! values.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use portcullis_core::{
    Ability, AbilityOptions, ActorId, ActorView, Decide, Names, RoleAndOwnsOptions, VersionKey,
};
use serde_json::Value;

use crate::state::PermissionState;

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// What subscribers receive after a mutation.
#[derive(Debug, Clone)]
pub struct StateChange {
    /// Key of the new state.
    pub key: VersionKey,
    pub previous: PermissionState,
    pub current: PermissionState,
}

impl StateChange {
    /// The actor id changed between the two states.
    pub fn actor_changed(&self) -> bool {
        self.previous.actor_id != self.current.actor_id
    }
}

type Subscriber = Arc<dyn Fn(&StateChange) + Send + Sync>;

struct Derived {
    state: PermissionState,
    view: Option<Arc<dyn ActorView>>,
    key: VersionKey,
}

/// Changes waiting for delivery, oldest first.
#[derive(Default)]
struct Outbox {
    pending: VecDeque<StateChange>,
    delivering: bool,
}

/// Frees the outbox when a subscriber panics mid-delivery.
struct ReleaseOnPanic<'a>(&'a ChangeNotifier);

impl Drop for ReleaseOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.outbox().delivering = false;
        }
    }
}

/// Reactive container of the permission state.
pub struct ChangeNotifier {
    decider: Arc<dyn Decide>,
    inner: RwLock<Derived>,
    outbox: Mutex<Outbox>,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
}

impl ChangeNotifier {
    /// Create a notifier and derive the first view from `initial`.
    pub fn new(decider: Arc<dyn Decide>, initial: PermissionState) -> Self {
        let view = decider.decide(&initial.roles, &initial.permissions, initial.actor_id.as_ref());
        Self::with_view(decider, initial, Some(view))
    }

    /// Create a notifier without deriving a view.
    ///
    /// Until the first mutation every query answers `false`.
    pub fn lazy(decider: Arc<dyn Decide>, initial: PermissionState) -> Self {
        Self::with_view(decider, initial, None)
    }

    fn with_view(
        decider: Arc<dyn Decide>,
        state: PermissionState,
        view: Option<Arc<dyn ActorView>>,
    ) -> Self {
        Self {
            decider,
            inner: RwLock::new(Derived {
                state,
                view,
                key: VersionKey::next(),
            }),
            outbox: Mutex::new(Outbox::default()),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Derived> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Derived> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn outbox(&self) -> std::sync::MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the state, rebuild the view, bump the key, then notify.
    pub fn update<F>(&self, mutate: F) -> StateChange
    where
        F: FnOnce(&mut PermissionState),
    {
        let change = {
            let mut inner = self.write();
            let previous = inner.state.clone();

            mutate(&mut inner.state);
            let view = self.decider.decide(
                &inner.state.roles,
                &inner.state.permissions,
                inner.state.actor_id.as_ref(),
            );
            inner.view = Some(view);
            inner.key = VersionKey::next();

            let change = StateChange {
                key: inner.key,
                previous,
                current: inner.state.clone(),
            };
            // Enqueue before the write lock drops so queue order is key order.
            self.outbox().pending.push_back(change.clone());
            change
        };

        tracing::debug!(
            key = %change.key,
            roles = change.current.roles.len(),
            permissions = change.current.permissions.len(),
            "permission state replaced, actor view rebuilt"
        );

        self.deliver();
        change
    }

    /// Drain the outbox unless another caller already is.
    fn deliver(&self) {
        {
            let mut outbox = self.outbox();
            if outbox.delivering {
                return;
            }
            outbox.delivering = true;
        }
        let _release = ReleaseOnPanic(self);

        loop {
            let change = {
                let mut outbox = self.outbox();
                match outbox.pending.pop_front() {
                    Some(change) => change,
                    None => {
                        outbox.delivering = false;
                        return;
                    }
                }
            };

            let subscribers: Vec<Subscriber> = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|(_, s)| Arc::clone(s))
                .collect();
            for subscriber in subscribers {
                subscriber(&change);
            }
        }
    }

    /// Register a callback run after every mutation, in key order.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() < before
    }

    /// Current key.
    pub fn key(&self) -> VersionKey {
        self.read().key
    }

    /// Copy of the current state.
    pub fn state(&self) -> PermissionState {
        self.read().state.clone()
    }

    /// The current view, if one has been derived.
    pub fn view(&self) -> Option<Arc<dyn ActorView>> {
        self.read().view.clone()
    }

    /// A consistent capture of view, key and identity.
    pub fn snapshot(&self) -> ActorSnapshot {
        let inner = self.read();
        ActorSnapshot {
            view: inner.view.clone(),
            key: inner.key,
            actor_id: inner.state.actor_id.clone(),
            logged_in: inner.state.logged_in,
        }
    }

    /// True when `key` is no longer the current key.
    pub fn is_stale(&self, key: VersionKey) -> bool {
        self.key() != key
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("ChangeNotifier")
            .field("key", &inner.key)
            .field("state", &inner.state)
            .field("derived", &inner.view.is_some())
            .finish()
    }
}

/// An actor view captured together with the key it was derived at.
///
/// Queries fail closed: with no view they answer `false`.
#[derive(Debug, Clone)]
pub struct ActorSnapshot {
    view: Option<Arc<dyn ActorView>>,
    key: VersionKey,
    actor_id: Option<ActorId>,
    logged_in: Option<bool>,
}

impl ActorSnapshot {
    pub fn key(&self) -> VersionKey {
        self.key
    }

    pub fn actor_id(&self) -> Option<&ActorId> {
        self.actor_id.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in == Some(true)
    }

    pub fn is_decided(&self) -> bool {
        self.view.is_some()
    }

    pub fn has_role(&self, roles: &Names, require_all: bool) -> bool {
        self.view
            .as_ref()
            .map_or(false, |v| v.has_role(roles, require_all))
    }

    pub fn can(&self, permissions: &Names, require_all: bool) -> bool {
        self.view
            .as_ref()
            .map_or(false, |v| v.can(permissions, require_all))
    }

    pub fn owns(&self, record: &Value, foreign_key: &str) -> bool {
        self.view
            .as_ref()
            .map_or(false, |v| v.owns(record, foreign_key))
    }

    pub fn ability(&self, roles: &Names, permissions: &Names, options: AbilityOptions) -> Ability {
        self.view
            .as_ref()
            .map_or_else(Ability::denied, |v| v.ability(roles, permissions, options))
    }

    pub fn can_and_owns(
        &self,
        permissions: &Names,
        record: &Value,
        options: &RoleAndOwnsOptions,
    ) -> bool {
        self.view
            .as_ref()
            .map_or(false, |v| v.can_and_owns(permissions, record, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portcullis_core::{RoleAssignment, StandardDecider};
    use std::sync::Mutex;

    fn notifier() -> ChangeNotifier {
        ChangeNotifier::new(Arc::new(StandardDecider), PermissionState::guest("Guest"))
    }

    #[test]
    fn test_initial_view_is_derived() {
        let n = notifier();
        assert!(n.snapshot().has_role(&Names::from("Guest"), false));
    }

    #[test]
    fn test_lazy_notifier_fails_closed_until_first_update() {
        let n = ChangeNotifier::lazy(Arc::new(StandardDecider), PermissionState::guest("Guest"));
        let before = n.snapshot();
        assert!(!before.is_decided());
        assert!(!before.has_role(&Names::from("Guest"), false));
        let ability =
            before.ability(&Names::from("Guest"), &Names::empty(), AbilityOptions::default());
        assert!(!ability.granted);

        n.update(|_| {});
        assert!(n.snapshot().has_role(&Names::from("Guest"), false));
    }

    #[test]
    fn test_update_rebuilds_view_and_bumps_key() {
        let n = notifier();
        let old = n.snapshot();

        n.update(|s| s.roles = vec![RoleAssignment::new("Admin")]);

        let new = n.snapshot();
        assert!(new.key() > old.key());
        assert!(n.is_stale(old.key()));
        assert!(new.has_role(&Names::from("Admin"), false));
        // The old snapshot still answers for the state it captured.
        assert!(old.has_role(&Names::from("Guest"), false));
        assert!(!old.has_role(&Names::from("Admin"), false));
    }

    #[test]
    fn test_identical_write_still_bumps_key() {
        let n = notifier();
        let before = n.key();
        let same = n.state();
        n.update(|s| *s = same);
        assert_ne!(n.key(), before);
    }

    #[test]
    fn test_subscribers_see_previous_and_current() {
        let n = notifier();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = n.subscribe(move |change| {
            let ids = (change.previous.actor_id.clone(), change.current.actor_id.clone());
            sink.lock().unwrap().push(ids);
        });

        n.update(|s| s.actor_id = Some(ActorId::from("u1")));
        assert!(n.unsubscribe(id));
        assert!(!n.unsubscribe(id));
        n.update(|s| s.actor_id = None);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (None, Some(ActorId::from("u1"))));
    }

    #[test]
    fn test_subscriber_can_read_notifier() {
        let n = Arc::new(notifier());
        let reader = Arc::clone(&n);
        let observed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&observed);
        n.subscribe(move |change| {
            *sink.lock().unwrap() = Some(reader.key() == change.key);
        });

        n.update(|s| s.logged_in = Some(true));
        assert_eq!(*observed.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_concurrent_writers_deliver_in_key_order() {
        let n = Arc::new(notifier());
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&delivered);
        n.subscribe(move |change| sink.lock().unwrap().push(change.key));

        let writers: Vec<_> = (0..8)
            .map(|t| {
                let n = Arc::clone(&n);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        n.update(|s| {
                            s.permissions = [format!("perm.{t}.{i}")].into_iter().collect();
                        });
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 400);
        assert!(delivered.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(delivered.last().copied(), Some(n.key()));
    }

    #[test]
    fn test_subscriber_may_mutate_notifier() {
        let n = Arc::new(notifier());
        let writer = Arc::clone(&n);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        n.subscribe(move |change| {
            sink.lock().unwrap().push(change.current.logged_in);
            if change.current.logged_in == Some(true) {
                writer.update(|s| s.logged_in = Some(false));
            }
        });

        n.update(|s| s.logged_in = Some(true));
        assert_eq!(*seen.lock().unwrap(), vec![Some(true), Some(false)]);
        assert_eq!(n.state().logged_in, Some(false));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn role_names() -> impl Strategy<Value = Vec<String>> {
            prop::collection::vec("[A-Z][a-z]{1,6}", 0..4)
        }

        proptest! {
            #[test]
            fn key_changes_on_every_update(writes in prop::collection::vec(role_names(), 1..12)) {
                let n = notifier();
                let mut last = n.key();
                for roles in writes {
                    n.update(|s| s.roles = roles.iter().map(RoleAssignment::new).collect());
                    let key = n.key();
                    prop_assert!(key > last);
                    last = key;
                }
            }

            #[test]
            fn view_reflects_last_write(
                roles in role_names(),
                perms in prop::collection::vec("[a-z]{1,5}\\.[a-z]{1,5}", 0..4),
            ) {
                let n = notifier();
                n.update(|s| {
                    s.roles = roles.iter().map(RoleAssignment::new).collect();
                    s.permissions = perms.iter().cloned().collect();
                });
                let snap = n.snapshot();
                for role in &roles {
                    prop_assert!(snap.has_role(&Names::from(role.as_str()), false));
                }
                for perm in &perms {
                    prop_assert!(snap.can(&Names::from(perm.as_str()), false));
                }
                if !roles.iter().any(|r| r == "Guest") {
                    prop_assert!(!snap.has_role(&Names::from("Guest"), false));
                }
            }
        }
    }
}
