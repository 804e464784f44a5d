//! Ambient request scope.
//!
//! Hosts that cannot thread a [`RequestContext`] through every call site
//! install it once per request (typically in middleware) and let
//! [`SerializerContext::from_scope`](crate::SerializerContext::from_scope)
//! pick it up. The scope is task-local: concurrent requests on the same
//! runtime never observe each other's context.
//!
//! ```
//! use fieldperm_core::scope::{current_request, sync_with_request};
//! use fieldperm_core::{RequestContext, User};
//!
//! assert!(current_request().is_none());
//! let name = sync_with_request(RequestContext::new(User::authenticated("alice")), || {
//!     current_request().map(|r| r.user.username.clone())
//! });
//! assert_eq!(name.as_deref(), Some("alice"));
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::request::RequestContext;

tokio::task_local! {
    static CURRENT_REQUEST: Arc<RequestContext>;
}

/// Runs `future` with `request` installed as the current request.
pub async fn with_request<F>(request: impl Into<Arc<RequestContext>>, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_REQUEST.scope(request.into(), future).await
}

/// Runs `f` with `request` installed as the current request.
pub fn sync_with_request<R>(request: impl Into<Arc<RequestContext>>, f: impl FnOnce() -> R) -> R {
    CURRENT_REQUEST.sync_scope(request.into(), f)
}

/// The request installed by the innermost enclosing scope, if any.
pub fn current_request() -> Option<Arc<RequestContext>> {
    CURRENT_REQUEST.try_with(Arc::clone).ok()
}
