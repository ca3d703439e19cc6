//! Access configuration.

use std::path::Path;

use anyhow::Context;
use portcullis_core::{Location, DEFAULT_FOREIGN_KEY, DEFAULT_GUEST_ROLE};
use portcullis_router::GuardSettings;
use serde::{Deserialize, Serialize};

use crate::error::{AccessError, Result};

/// Configuration of an [`Access`](crate::Access) instance.
///
/// Every field has a default, so a JSON document only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Record field compared with the actor id by ownership checks.
    pub foreign_key_name: String,

    /// Role of an actor that has not logged in, and after `reset`.
    pub not_login_role_name: String,

    /// Routes must be supplied at build time.
    pub router: bool,

    /// Guard names run in front of every navigation.
    pub global_middleware: Vec<String>,

    /// Where the login guard sends anonymous actors.
    pub login_route: Option<Location>,

    /// Where a logged-in actor visiting the login route is sent.
    pub default_route: Option<Location>,

    /// Where the access guard sends actors lacking a role or permission.
    /// Without it the navigation is cancelled.
    pub permission_deny_redirect_route: Option<Location>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            foreign_key_name: DEFAULT_FOREIGN_KEY.to_string(),
            not_login_role_name: DEFAULT_GUEST_ROLE.to_string(),
            router: false,
            global_middleware: Vec::new(),
            login_route: None,
            default_route: None,
            permission_deny_redirect_route: None,
        }
    }
}

impl AccessConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading access config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("loading access config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.not_login_role_name.trim().is_empty() {
            return Err(AccessError::Configuration(
                "not_login_role_name must not be empty".to_string(),
            ));
        }
        if self.foreign_key_name.trim().is_empty() {
            return Err(AccessError::Configuration(
                "foreign_key_name must not be empty".to_string(),
            ));
        }
        if let Some(name) = self.global_middleware.iter().find(|n| n.trim().is_empty()) {
            return Err(AccessError::Configuration(format!(
                "global middleware names must not be empty, got {name:?}"
            )));
        }
        Ok(())
    }

    /// Redirect destinations for the built-in guards.
    pub fn guard_settings(&self) -> GuardSettings {
        GuardSettings {
            login_route: self.login_route.clone(),
            default_route: self.default_route.clone(),
            permission_deny_redirect_route: self.permission_deny_redirect_route.clone(),
        }
    }
}
