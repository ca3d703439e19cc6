//! Navigation locations.
//!
//! A [`Location`] is what a navigation targets and what a guard redirects to.
//! Query values are kept structured and only form-encoded when a location is
//! rendered, so a redirect-back parameter holding a full path with its own
//! query survives a render and parse cycle intact.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::{CoreError, Result};

/// A navigation destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Absolute path, always starting with `/`.
    pub path: String,

    /// Optional route name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Query parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
}

impl Location {
    /// Create a location for a path. The path is taken as given.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            query: BTreeMap::new(),
        }
    }

    /// Attach a route name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a query parameter, replacing any previous value for `key`.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Get a query parameter.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Path plus form-encoded query (`/a?k=v&x=y`), in key order.
    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.query {
            query.append_pair(key, value);
        }
        format!("{}?{}", self.path, query.finish())
    }

    /// True when both locations point at the same path, ignoring query and name.
    pub fn same_path(&self, other: &Location) -> bool {
        self.path == other.path
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}

impl FromStr for Location {
    type Err = CoreError;

    /// Parse `"/path?k=v&x"`, decoding the query. A key without `=` gets an
    /// empty value.
    fn from_str(input: &str) -> Result<Self> {
        let (path, query) = match input.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (input, None),
        };

        if path.is_empty() {
            return Err(CoreError::InvalidLocation {
                input: input.to_string(),
                reason: "empty path",
            });
        }
        if !path.starts_with('/') {
            return Err(CoreError::InvalidLocation {
                input: input.to_string(),
                reason: "path must start with '/'",
            });
        }

        let mut location = Location::new(path);
        if let Some(query) = query {
            for (key, value) in form_urlencoded::parse(query.as_bytes()) {
                location.query.insert(key.into_owned(), value.into_owned());
            }
        }
        Ok(location)
    }
}
