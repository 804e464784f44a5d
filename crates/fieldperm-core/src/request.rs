//! Request context carried into every permission check.
//!
//! The host application authenticates the caller and builds a
//! [`RequestContext`]; fieldperm only reads it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The caller identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login name. Empty for anonymous callers.
    pub username: String,

    /// Whether the host authenticated this caller.
    pub authenticated: bool,

    /// Roles granted to the caller.
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl User {
    /// An authenticated user with no roles.
    pub fn authenticated(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            authenticated: true,
            roles: BTreeSet::new(),
        }
    }

    /// An unauthenticated caller.
    pub fn anonymous() -> Self {
        Self {
            username: String::new(),
            authenticated: false,
            roles: BTreeSet::new(),
        }
    }

    /// Grants a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Returns true if the user holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Per-call carrier of caller identity and request metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// The caller.
    pub user: User,

    /// HTTP method or equivalent verb, if the host has one.
    pub method: Option<String>,

    /// Request path, if the host has one.
    pub path: Option<String>,

    /// Free-form host attributes (tenant id, client id, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl RequestContext {
    /// Creates a request context for `user`.
    pub fn new(user: User) -> Self {
        Self {
            user,
            method: None,
            path: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Creates a request context for an anonymous caller.
    pub fn anonymous() -> Self {
        Self::new(User::anonymous())
    }

    /// Sets the method and path.
    pub fn with_route(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.path = Some(path.into());
        self
    }

    /// Adds a host attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Looks up a host attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
