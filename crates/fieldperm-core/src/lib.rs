//! fieldperm Core — per-request, per-field authorization of serialized output.
//!
//! This crate has no internal fieldperm dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`request`]: Caller identity carried into permission checks
//! - [`permission`]: The permission trait, access policies, built-ins
//! - [`field`]: Output fields and the ordered field registry
//! - [`filter`]: The field authorization filter
//! - [`serializer`]: Serializers driving one filter pass per instance
//! - [`scope`]: Task-local ambient request context

#![doc = include_str!("../README.md")]

pub mod error;
pub mod field;
pub mod filter;
pub mod permission;
pub mod request;
pub mod scope;
pub mod serializer;

// Re-export key types at crate root for convenience
pub use error::{BoxError, Error, Result};
pub use field::{Field, FieldKind, FieldSet};
pub use filter::{FilteredFields, filter_fields};
pub use permission::{AccessPolicy, FieldPermission, PermissionResult};
pub use request::{RequestContext, User};
pub use serializer::{RepresentationPass, Serializer, SerializerBuilder, SerializerContext};
