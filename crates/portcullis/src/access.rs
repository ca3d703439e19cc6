//! The access facade.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use portcullis_core::{
    assign_roles, Ability, AbilityOptions, Decide, Location, Names, RoleAndOwnsOptions,
    RoleAssignment, RoleSpec, StandardDecider, VersionKey,
};
use portcullis_pipeline::{Guard, GuardRegistry, SharedGuardRegistry};
use portcullis_router::{
    register_builtin_guards, GuardContext, NavigationGuardCoordinator, NavigationOutcome,
    RouteResolver,
};
use portcullis_state::{
    ActorSnapshot, ChangeNotifier, EventBus, HandlerId, LoginInfo, PermissionState, StateChange,
    USER_LOGIN, USER_LOGIN_CHANGE, USER_LOGOUT,
};
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::config::AccessConfig;
use crate::error::{AccessError, Result};

/// Builder for [`Access`].
pub struct AccessBuilder<E = ()> {
    config: AccessConfig,
    decider: Arc<dyn Decide>,
    routes: Option<Arc<dyn RouteResolver>>,
    extension: E,
}

impl Default for AccessBuilder<()> {
    fn default() -> Self {
        Self {
            config: AccessConfig::default(),
            decider: Arc::new(StandardDecider),
            routes: None,
            extension: (),
        }
    }
}

impl<E> AccessBuilder<E> {
    pub fn config(mut self, config: AccessConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the [`StandardDecider`].
    pub fn decider(mut self, decider: impl Decide + 'static) -> Self {
        self.decider = Arc::new(decider);
        self
    }

    /// Install routing with these routes when building.
    pub fn routes(mut self, routes: impl RouteResolver + 'static) -> Self {
        self.routes = Some(Arc::new(routes));
        self
    }

    /// Attach caller-defined data kept next to the permission state.
    pub fn extension<F>(self, extension: F) -> AccessBuilder<F> {
        AccessBuilder {
            config: self.config,
            decider: self.decider,
            routes: self.routes,
            extension,
        }
    }

    pub fn build(self) -> Result<Access<E>> {
        self.config.validate()?;
        if self.config.router && self.routes.is_none() {
            return Err(AccessError::Configuration(
                "router is enabled but no routes were given".to_string(),
            ));
        }

        let notifier = Arc::new(ChangeNotifier::new(
            self.decider,
            PermissionState::guest(self.config.not_login_role_name.clone()),
        ));
        let events = Arc::new(EventBus::new());
        let (key_tx, key_rx) = watch::channel(notifier.key());
        {
            let events = Arc::clone(&events);
            notifier.subscribe(move |change| {
                key_tx.send_if_modified(|current| {
                    if change.key > *current {
                        *current = change.key;
                        true
                    } else {
                        false
                    }
                });
                emit_lifecycle(&events, change);
            });
        }

        let mut registry = GuardRegistry::new();
        register_builtin_guards(&mut registry, &self.config.guard_settings());

        let access = Access {
            config: self.config,
            notifier,
            events,
            registry: registry.shared(),
            coordinator: OnceLock::new(),
            extension: RwLock::new(self.extension),
            keys: key_rx,
        };
        if let Some(routes) = self.routes {
            access.install(routes);
        }
        Ok(access)
    }
}

/// The lifecycle event for an actor id transition, if any.
fn lifecycle_event(change: &StateChange) -> Option<&'static str> {
    match (&change.previous.actor_id, &change.current.actor_id) {
        (None, Some(_)) => Some(USER_LOGIN),
        (Some(_), None) => Some(USER_LOGOUT),
        (Some(before), Some(after)) if before != after => Some(USER_LOGIN_CHANGE),
        _ => None,
    }
}

fn emit_lifecycle(events: &EventBus, change: &StateChange) {
    let Some(event) = lifecycle_event(change) else {
        return;
    };
    let payload = json!({
        "previous": change.previous.actor_id,
        "current": change.current.actor_id,
        "key": change.key.as_u64(),
    });
    let handlers = events.emit(event, &payload);
    tracing::debug!(event, handlers, key = %change.key, "lifecycle event emitted");
}

/// Role and permission state of one actor, with navigation guarding.
///
/// Every mutation is synchronous: when it returns, the actor view has been
/// rebuilt and the [`VersionKey`] has moved on. Subscribers have run too,
/// unless another thread was already delivering changes; that thread then
/// delivers this one after its own, in key order.
pub struct Access<E = ()> {
    config: AccessConfig,
    notifier: Arc<ChangeNotifier>,
    events: Arc<EventBus>,
    registry: SharedGuardRegistry<GuardContext>,
    coordinator: OnceLock<NavigationGuardCoordinator>,
    extension: RwLock<E>,
    keys: watch::Receiver<VersionKey>,
}

impl Access<()> {
    pub fn builder() -> AccessBuilder<()> {
        AccessBuilder::default()
    }

    /// Build with `config` and the standard decider.
    pub fn new(config: AccessConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }
}

impl<E> Access<E> {
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the roles.
    pub fn set_role(&self, roles: impl Into<RoleSpec>) -> VersionKey {
        let assigned = assign_roles(roles.into(), None);
        self.notifier.update(move |state| state.roles = assigned).key
    }

    /// Replace the roles, scoping `permissions` to each named role.
    ///
    /// A single role given by name also gets `permissions` as the global
    /// permission set.
    pub fn set_role_with_permissions(
        &self,
        roles: impl Into<RoleSpec>,
        permissions: impl Into<Names>,
    ) -> VersionKey {
        let (assigned, global) = scoped_roles(roles.into(), permissions.into());
        self.notifier
            .update(move |state| {
                state.roles = assigned;
                if let Some(global) = global {
                    state.permissions = global;
                }
            })
            .key
    }

    /// Add roles after the current ones.
    pub fn append_role(&self, roles: impl Into<RoleSpec>) -> VersionKey {
        let assigned = assign_roles(roles.into(), None);
        self.notifier.update(move |state| state.roles.extend(assigned)).key
    }

    /// Add roles with scoped permissions, as
    /// [`set_role_with_permissions`](Self::set_role_with_permissions).
    pub fn append_role_with_permissions(
        &self,
        roles: impl Into<RoleSpec>,
        permissions: impl Into<Names>,
    ) -> VersionKey {
        let (assigned, global) = scoped_roles(roles.into(), permissions.into());
        self.notifier
            .update(move |state| {
                state.roles.extend(assigned);
                if let Some(global) = global {
                    state.permissions = global;
                }
            })
            .key
    }

    /// Replace the global permissions.
    pub fn set_permission(&self, permissions: impl Into<Names>) -> VersionKey {
        let permissions = permissions.into().to_set();
        self.notifier.update(move |state| state.permissions = permissions).key
    }

    /// Add global permissions.
    pub fn append_permission(&self, permissions: impl Into<Names>) -> VersionKey {
        let permissions = permissions.into().to_set();
        self.notifier.update(move |state| state.permissions.extend(permissions)).key
    }

    /// Apply a partial update of roles, permissions, actor id and login flag.
    pub fn set_login_user_info(&self, info: LoginInfo) -> VersionKey {
        self.notifier.update(move |state| info.apply_to(state)).key
    }

    /// Back to the anonymous state: only the guest role, nothing else.
    pub fn reset(&self) -> VersionKey {
        let guest = PermissionState::guest(self.config.not_login_role_name.clone());
        self.notifier.update(move |state| *state = guest).key
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// A consistent capture of the current view and key.
    pub fn snapshot(&self) -> ActorSnapshot {
        self.notifier.snapshot()
    }

    pub fn state(&self) -> PermissionState {
        self.notifier.state()
    }

    pub fn key(&self) -> VersionKey {
        self.notifier.key()
    }

    /// Receiver that observes every new key.
    pub fn watch_key(&self) -> watch::Receiver<VersionKey> {
        self.keys.clone()
    }

    /// The raw login flag; `None` until one was set.
    pub fn is_login(&self) -> Option<bool> {
        self.notifier.state().logged_in
    }

    pub fn has_role(&self, roles: impl Into<Names>, require_all: bool) -> bool {
        self.snapshot().has_role(&roles.into(), require_all)
    }

    pub fn can(&self, permissions: impl Into<Names>, require_all: bool) -> bool {
        self.snapshot().can(&permissions.into(), require_all)
    }

    /// Alias of [`can`](Self::can).
    pub fn has_permission(&self, permissions: impl Into<Names>, require_all: bool) -> bool {
        self.can(permissions, require_all)
    }

    /// Alias of [`can`](Self::can).
    pub fn is_able_to(&self, permissions: impl Into<Names>, require_all: bool) -> bool {
        self.can(permissions, require_all)
    }

    /// Ownership under the configured foreign key.
    pub fn owns(&self, record: &Value) -> bool {
        self.owns_by(record, &self.config.foreign_key_name)
    }

    pub fn owns_by(&self, record: &Value, foreign_key: &str) -> bool {
        self.snapshot().owns(record, foreign_key)
    }

    pub fn ability(
        &self,
        roles: impl Into<Names>,
        permissions: impl Into<Names>,
        options: AbilityOptions,
    ) -> Ability {
        self.snapshot()
            .ability(&roles.into(), &permissions.into(), options)
    }

    /// Permission and ownership under the configured foreign key.
    pub fn can_and_owns(
        &self,
        permissions: impl Into<Names>,
        record: &Value,
        require_all: bool,
    ) -> bool {
        let options = RoleAndOwnsOptions {
            require_all,
            foreign_key_name: self.config.foreign_key_name.clone(),
        };
        self.can_and_owns_with(permissions, record, &options)
    }

    pub fn can_and_owns_with(
        &self,
        permissions: impl Into<Names>,
        record: &Value,
        options: &RoleAndOwnsOptions,
    ) -> bool {
        self.snapshot()
            .can_and_owns(&permissions.into(), record, options)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn on<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.events.on(event, handler)
    }

    pub fn once<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.events.once(event, handler)
    }

    /// Remove one handler, or every handler of `event` when `id` is `None`.
    pub fn off(&self, event: &str, id: Option<HandlerId>) -> usize {
        self.events.off(event, id)
    }

    /// Emit `event`, returning how many handlers ran.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        self.events.emit(event, payload)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Extension data
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the extension data. The actor view is not rebuilt.
    pub fn set_extension(&self, extension: E) {
        *self.extension.write().unwrap_or_else(PoisonError::into_inner) = extension;
    }

    pub fn update_extension<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        let mut extension = self.extension.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *extension)
    }

    pub fn with_extension<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        let extension = self.extension.read().unwrap_or_else(PoisonError::into_inner);
        f(&*extension)
    }

    pub fn extension(&self) -> E
    where
        E: Clone,
    {
        self.with_extension(E::clone)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────

    /// The guard registry. The built-in `login` and `access` guards are
    /// registered at build time and can be replaced.
    pub fn guards(&self) -> &SharedGuardRegistry<GuardContext> {
        &self.registry
    }

    /// Register (or replace) a named guard.
    pub fn register_guard(&self, name: impl Into<String>, guard: Arc<dyn Guard<GuardContext>>) {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(name, guard);
    }

    /// Enable navigation guarding over `routes`.
    ///
    /// Routing can be installed once. A second call logs a warning, changes
    /// nothing and returns `false`.
    pub fn install_router(&self, routes: impl RouteResolver + 'static) -> bool {
        self.install(Arc::new(routes))
    }

    fn install(&self, routes: Arc<dyn RouteResolver>) -> bool {
        let coordinator = NavigationGuardCoordinator::new(
            routes,
            Arc::clone(&self.registry),
            Arc::clone(&self.notifier),
        )
        .with_global_guards(self.config.global_middleware.iter().cloned());

        if self.coordinator.set(coordinator).is_err() {
            tracing::warn!("routing is already installed; ignoring second installation");
            return false;
        }
        tracing::debug!(global = ?self.config.global_middleware, "routing installed");
        true
    }

    pub fn coordinator(&self) -> Option<&NavigationGuardCoordinator> {
        self.coordinator.get()
    }

    fn routing(&self) -> Result<&NavigationGuardCoordinator> {
        self.coordinator.get().ok_or_else(|| {
            AccessError::Configuration("navigation checks need routing to be installed".to_string())
        })
    }

    /// Run the guards of a navigation and report how it ended.
    pub async fn resolve(
        &self,
        target: &Location,
        current: Option<&Location>,
    ) -> Result<NavigationOutcome> {
        Ok(self.routing()?.resolve(target, current).await?)
    }

    /// True when the navigation would be allowed.
    pub async fn is_allowed(&self, target: &Location, current: Option<&Location>) -> Result<bool> {
        Ok(self.routing()?.is_allowed(target, current).await?)
    }
}

/// Named roles with `permissions` scoped to them, plus the global set a
/// single named role also receives.
fn scoped_roles(
    spec: RoleSpec,
    permissions: Names,
) -> (Vec<RoleAssignment>, Option<BTreeSet<String>>) {
    let global = spec.is_single_name().then(|| permissions.to_set());
    (assign_roles(spec, Some(&permissions)), global)
}

impl<E> std::fmt::Debug for Access<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Access")
            .field("config", &self.config)
            .field("notifier", &self.notifier)
            .field("routing", &self.coordinator.get().is_some())
            .finish_non_exhaustive()
    }
}
