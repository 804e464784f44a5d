//! Field-level permission checks.
//!
//! A [`FieldPermission`] is a predicate over a request and the optional
//! instance being serialized. Fields carry an [`AccessPolicy`], an ordered
//! list of permissions combined with logical AND.
//!
//! # Example
//!
//! ```
//! use fieldperm_core::permission::{AccessPolicy, AllowAny, IsAuthenticated};
//! use fieldperm_core::{RequestContext, User};
//!
//! let policy = AccessPolicy::new().with(AllowAny).with(IsAuthenticated);
//!
//! let alice = RequestContext::new(User::authenticated("alice"));
//! assert!(policy.check(&alice, None).unwrap());
//!
//! let anonymous = RequestContext::anonymous();
//! assert!(!policy.check(&anonymous, None).unwrap());
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::BoxError;
use crate::field::lookup;
use crate::request::RequestContext;

/// Outcome of a single predicate: `Ok(visible)` or the predicate's own failure.
pub type PermissionResult = std::result::Result<bool, BoxError>;

/// A predicate deciding whether a field may be shown.
///
/// Implementors override one or both hooks; each defaults to allowing.
/// Predicates may perform read-only lookups but receive request and
/// instance by shared reference only.
///
/// # Bounds
///
/// - `Send + Sync`: serializers holding permissions are shared across threads
/// - `Debug`: policies show up in serializer debug output
pub trait FieldPermission: Send + Sync + fmt::Debug {
    /// Request-level check, evaluated for every pass.
    fn has_permission(&self, _request: &RequestContext) -> PermissionResult {
        Ok(true)
    }

    /// Object-level check, evaluated only when an instance is present.
    fn has_object_permission(&self, _request: &RequestContext, _instance: &Value) -> PermissionResult {
        Ok(true)
    }

    /// Combined check used by [`AccessPolicy`].
    ///
    /// `instance` is `None` when serializing without a source object
    /// (a `null` instance counts as absent).
    fn check(&self, request: &RequestContext, instance: Option<&Value>) -> PermissionResult {
        if !self.has_permission(request)? {
            return Ok(false);
        }
        match instance {
            Some(instance) => self.has_object_permission(request, instance),
            None => Ok(true),
        }
    }
}

/// Ordered set of permissions guarding one field.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    permissions: Vec<Arc<dyn FieldPermission>>,
}

impl AccessPolicy {
    /// Creates an empty policy. An empty policy allows everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a permission.
    pub fn with(mut self, permission: impl FieldPermission + 'static) -> Self {
        self.permissions.push(Arc::new(permission));
        self
    }

    /// Appends an already shared permission.
    pub fn with_shared(mut self, permission: Arc<dyn FieldPermission>) -> Self {
        self.permissions.push(permission);
        self
    }

    /// The permissions in evaluation order.
    pub fn permissions(&self) -> &[Arc<dyn FieldPermission>] {
        &self.permissions
    }

    /// Number of permissions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns true if the policy has no permissions.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Evaluates every permission in order, stopping at the first denial.
    pub fn check(&self, request: &RequestContext, instance: Option<&Value>) -> PermissionResult {
        let instance = instance.filter(|value| !value.is_null());
        for permission in &self.permissions {
            if !permission.check(request, instance)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// ============================================================================
// Built-in permissions
// ============================================================================

/// Always allows.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAny;

impl FieldPermission for AllowAny {}

/// Always denies.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowNone;

impl FieldPermission for AllowNone {
    fn has_permission(&self, _request: &RequestContext) -> PermissionResult {
        Ok(false)
    }

    fn has_object_permission(&self, _request: &RequestContext, _instance: &Value) -> PermissionResult {
        Ok(false)
    }
}

/// Allows authenticated callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAuthenticated;

impl FieldPermission for IsAuthenticated {
    fn has_permission(&self, request: &RequestContext) -> PermissionResult {
        Ok(request.user.authenticated)
    }
}

/// Allows callers holding a role.
#[derive(Debug, Clone)]
pub struct HasRole {
    role: String,
}

impl HasRole {
    /// Requires `role`.
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }
}

impl FieldPermission for HasRole {
    fn has_permission(&self, request: &RequestContext) -> PermissionResult {
        Ok(request.user.has_role(&self.role))
    }
}

/// Allows the caller whose username equals an attribute of the instance.
///
/// Only the object-level hook is restricted, so without an instance the
/// field stays visible.
#[derive(Debug, Clone)]
pub struct IsOwner {
    attribute: String,
}

impl IsOwner {
    /// Compares the username against the (dotted) `attribute` path.
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

impl FieldPermission for IsOwner {
    fn has_object_permission(&self, request: &RequestContext, instance: &Value) -> PermissionResult {
        match lookup(instance, &self.attribute) {
            Some(Value::String(owner)) => {
                Ok(request.user.authenticated && *owner == request.user.username)
            }
            Some(Value::Null) | None => Ok(false),
            Some(other) => Err(format!(
                "owner attribute '{}' must be a string, found {}",
                self.attribute, other
            )
            .into()),
        }
    }
}

type CheckFn = dyn Fn(&RequestContext, Option<&Value>) -> PermissionResult + Send + Sync;

/// Permission backed by a closure over `(request, instance)`.
#[derive(Clone)]
pub struct FnPermission {
    name: String,
    check: Arc<CheckFn>,
}

impl FnPermission {
    /// Wraps `check` under a name used in debug output.
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&RequestContext, Option<&Value>) -> PermissionResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }
}

impl fmt::Debug for FnPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPermission")
            .field("name", &self.name)
            .finish()
    }
}

impl FieldPermission for FnPermission {
    fn check(&self, request: &RequestContext, instance: Option<&Value>) -> PermissionResult {
        (self.check)(request, instance)
    }
}
