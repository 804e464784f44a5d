//! Permission-aware serializers.
//!
//! A [`Serializer`] owns an immutable [`FieldSet`] and renders instances into
//! ordered JSON objects. Every call to [`Serializer::to_representation`] opens
//! a new [`RepresentationPass`], which filters the fields for that instance and
//! memoizes the result only for the duration of the pass. Nothing about the
//! instance or the filtered set is stored on the serializer itself, so one
//! `Arc<Serializer>` can be shared across requests and threads.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fieldperm_core::permission::IsAuthenticated;
//! use fieldperm_core::{Field, RequestContext, Serializer, SerializerContext, User};
//! use serde_json::json;
//!
//! let track = Serializer::builder("track")
//!     .field(Field::attribute("title"))
//!     .field(Field::attribute("duration").permission(IsAuthenticated))
//!     .build()
//!     .unwrap();
//!
//! let instance = json!({"title": "Intro", "duration": 245});
//!
//! let anonymous = SerializerContext::with_request(RequestContext::anonymous());
//! assert_eq!(track.to_representation(&instance, &anonymous).unwrap(), json!({"title": "Intro"}));
//!
//! let alice = SerializerContext::with_request(RequestContext::new(User::authenticated("alice")));
//! assert_eq!(track.to_representation(&instance, &alice).unwrap(), instance);
//! ```

use std::cell::OnceCell;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::field::{Field, FieldKind, FieldSet, lookup};
use crate::filter::{FilteredFields, filter_fields};
use crate::request::RequestContext;
use crate::scope;
use crate::{Error, Result};

// ============================================================================
// SerializerContext
// ============================================================================

/// Context shared by a serializer and all of its nested serializers.
#[derive(Debug, Clone, Default)]
pub struct SerializerContext {
    request: Option<Arc<RequestContext>>,
}

impl SerializerContext {
    /// A context without a request. Rendering with it fails with
    /// [`Error::Config`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A context carrying `request`.
    pub fn with_request(request: RequestContext) -> Self {
        Self::from_arc(Arc::new(request))
    }

    /// A context carrying an already shared request.
    pub fn from_arc(request: Arc<RequestContext>) -> Self {
        Self {
            request: Some(request),
        }
    }

    /// A context carrying whatever request the ambient scope has installed.
    pub fn from_scope() -> Self {
        Self {
            request: scope::current_request(),
        }
    }

    /// The request, if any.
    pub fn request(&self) -> Option<&RequestContext> {
        self.request.as_deref()
    }
}

// ============================================================================
// RepresentationPass
// ============================================================================

/// One rendering of one instance.
///
/// The filtered field set is computed at most once per pass and discarded with
/// it; the next pass starts from an empty memo.
pub struct RepresentationPass<'s, 'c, 'i> {
    serializer: &'s Serializer,
    context: &'c SerializerContext,
    instance: Option<&'i Value>,
    fields: OnceCell<FilteredFields<'s>>,
}

impl<'s, 'c, 'i> RepresentationPass<'s, 'c, 'i> {
    fn new(
        serializer: &'s Serializer,
        context: &'c SerializerContext,
        instance: Option<&'i Value>,
    ) -> Self {
        Self {
            serializer,
            context,
            instance,
            fields: OnceCell::new(),
        }
    }

    /// The fields visible in this pass.
    pub fn fields(&self) -> Result<&FilteredFields<'s>> {
        if let Some(fields) = self.fields.get() {
            return Ok(fields);
        }
        let computed = filter_fields(
            &self.serializer.fields,
            self.context.request(),
            self.instance,
        )?;
        Ok(self.fields.get_or_init(|| computed))
    }

    /// Renders the instance as an ordered JSON object.
    pub fn render(&self) -> Result<Value> {
        let instance = self.instance.unwrap_or(&Value::Null);
        let mut out = Map::new();
        for field in self.fields()?.iter() {
            out.insert(field.name().to_string(), self.render_field(field, instance)?);
        }
        Ok(Value::Object(out))
    }

    fn render_field(&self, field: &Field, instance: &Value) -> Result<Value> {
        if let FieldKind::Computed(compute) = field.kind() {
            return Ok(compute(instance));
        }

        let value = match lookup(instance, field.source_path()) {
            Some(value) => value,
            None if field.is_optional() => return Ok(Value::Null),
            None => return Err(Error::missing_attribute(field.name(), field.source_path())),
        };

        match field.kind() {
            FieldKind::Attribute | FieldKind::Computed(_) => Ok(value.clone()),
            FieldKind::Nested(child) => match value {
                Value::Null => Ok(Value::Null),
                object => child.to_representation(object, self.context),
            },
            FieldKind::NestedMany(child) => match value {
                Value::Null => Ok(Value::Null),
                Value::Array(items) => child.to_representation_many(items, self.context),
                other => Err(Error::invalid_data(format!(
                    "field '{}' expects an array at '{}', found {}",
                    field.name(),
                    field.source_path(),
                    json_type(other)
                ))),
            },
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Serializer
// ============================================================================

/// Renders instances through a permission-filtered field set.
#[derive(Debug, Clone)]
pub struct Serializer {
    name: String,
    fields: FieldSet,
}

impl Serializer {
    /// Starts building a serializer.
    pub fn builder(name: impl Into<String>) -> SerializerBuilder {
        SerializerBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Wraps an existing registry.
    pub fn new(name: impl Into<String>, fields: FieldSet) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// The serializer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full, unfiltered registry.
    pub fn declared_fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Opens a representation pass for `instance`.
    pub fn pass<'s, 'c, 'i>(
        &'s self,
        context: &'c SerializerContext,
        instance: Option<&'i Value>,
    ) -> RepresentationPass<'s, 'c, 'i> {
        RepresentationPass::new(self, context, instance)
    }

    /// The fields `context`'s caller may see for `instance`.
    pub fn fields_for(
        &self,
        context: &SerializerContext,
        instance: Option<&Value>,
    ) -> Result<FilteredFields<'_>> {
        filter_fields(&self.fields, context.request(), instance)
    }

    /// Renders one instance.
    pub fn to_representation(&self, instance: &Value, context: &SerializerContext) -> Result<Value> {
        self.pass(context, Some(instance)).render()
    }

    /// Renders each instance in its own pass.
    ///
    /// Fails with [`Error::Config`] when `context` carries no request, even
    /// for an empty slice.
    pub fn to_representation_many(
        &self,
        instances: &[Value],
        context: &SerializerContext,
    ) -> Result<Value> {
        context.request().ok_or_else(Error::missing_request)?;
        instances
            .iter()
            .map(|instance| self.to_representation(instance, context))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    /// Converts `value` with serde and renders it.
    ///
    /// Arrays render element-wise, anything else as a single instance.
    pub fn serialize<T: Serialize + ?Sized>(
        &self,
        value: &T,
        context: &SerializerContext,
    ) -> Result<Value> {
        match serde_json::to_value(value)? {
            Value::Array(items) => self.to_representation_many(&items, context),
            instance => self.to_representation(&instance, context),
        }
    }
}

/// Builder for [`Serializer`].
#[derive(Debug)]
pub struct SerializerBuilder {
    name: String,
    fields: Vec<Field>,
}

impl SerializerBuilder {
    /// Appends a field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Builds the serializer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error on duplicate field names.
    pub fn build(self) -> Result<Serializer> {
        let fields = FieldSet::from_fields(self.fields)?;
        Ok(Serializer::new(self.name, fields))
    }
}
