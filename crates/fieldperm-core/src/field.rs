//! Output fields and the ordered field registry.
//!
//! A [`Field`] is one named unit of output. It knows where its value comes
//! from ([`FieldKind`]) and, optionally, which [`AccessPolicy`] gates it.
//! A [`FieldSet`] keeps fields in declaration order and rejects duplicates.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::permission::{AccessPolicy, FieldPermission};
use crate::serializer::Serializer;
use crate::{Error, Result};

type ComputeFn = dyn Fn(&Value) -> Value + Send + Sync;

/// How a field derives its output value from the instance.
#[derive(Clone)]
pub enum FieldKind {
    /// Copies the attribute at the field's source path.
    Attribute,
    /// Renders the object at the source path with a child serializer.
    Nested(Arc<Serializer>),
    /// Renders each element of the array at the source path.
    NestedMany(Arc<Serializer>),
    /// Computes the value from the whole instance.
    Computed(Arc<ComputeFn>),
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute => f.write_str("Attribute"),
            Self::Nested(child) => f.debug_tuple("Nested").field(&child.name()).finish(),
            Self::NestedMany(child) => f.debug_tuple("NestedMany").field(&child.name()).finish(),
            Self::Computed(_) => f.write_str("Computed"),
        }
    }
}

/// A named, optionally access-controlled unit of output.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    source: Option<String>,
    kind: FieldKind,
    optional: bool,
    access: Option<AccessPolicy>,
}

impl Field {
    fn with_kind(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            source: None,
            kind,
            optional: false,
            access: None,
        }
    }

    /// A field copying the attribute of the same name.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Attribute)
    }

    /// A field rendering a nested object.
    pub fn nested(name: impl Into<String>, child: Arc<Serializer>) -> Self {
        Self::with_kind(name, FieldKind::Nested(child))
    }

    /// A field rendering a list of nested objects.
    pub fn nested_many(name: impl Into<String>, child: Arc<Serializer>) -> Self {
        Self::with_kind(name, FieldKind::NestedMany(child))
    }

    /// A field computed from the whole instance.
    pub fn computed<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self::with_kind(name, FieldKind::Computed(Arc::new(compute)))
    }

    /// Reads the value from a different (dotted) attribute path.
    pub fn source(mut self, path: impl Into<String>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Renders `null` instead of failing when the attribute is absent.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Adds a permission to this field's access policy.
    pub fn permission(mut self, permission: impl FieldPermission + 'static) -> Self {
        let policy = self.access.take().unwrap_or_default();
        self.access = Some(policy.with(permission));
        self
    }

    /// Replaces this field's access policy.
    pub fn access(mut self, policy: AccessPolicy) -> Self {
        self.access = Some(policy);
        self
    }

    /// The output name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attribute path values are read from.
    pub fn source_path(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }

    /// The value producer.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether a missing attribute renders `null`.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The access policy, if this field is access-controlled.
    pub fn access_policy(&self) -> Option<&AccessPolicy> {
        self.access.as_ref()
    }
}

/// Ordered registry of fields, keyed by output name.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: IndexMap<String, Field>,
}

impl FieldSet {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a field with the same name exists.
    pub fn insert(&mut self, field: Field) -> Result<()> {
        if self.fields.contains_key(field.name()) {
            return Err(Error::config(format!(
                "Duplicate field name '{}'",
                field.name()
            )));
        }
        self.fields.insert(field.name().to_string(), field);
        Ok(())
    }

    /// Builds a registry from fields in order.
    pub fn from_fields(fields: impl IntoIterator<Item = Field>) -> Result<Self> {
        let mut set = Self::new();
        for field in fields {
            set.insert(field)?;
        }
        Ok(set)
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Iterates fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Resolves a dotted path (`"band.leader"`) inside a JSON value.
///
/// Numeric segments index into arrays.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
