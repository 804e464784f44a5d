//! Handler functions for the `render` and `check` commands.
//!
//! `render` installs the caller's request in the ambient scope and renders
//! the document through the schema's root serializer, the same way a web
//! host would from middleware.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use fieldperm_core::{
    Error, FieldKind, RequestContext, Result, Serializer, SerializerContext, User, scope,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::schema::{Schema, describe_permission};

// ============================================================================
// Option types
// ============================================================================

/// Options for a render run.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Authenticated username; anonymous when `None`.
    pub user: Option<String>,
    /// Roles granted to the user.
    pub roles: Vec<String>,
    /// Render without any request context.
    pub no_request: bool,
    /// Pretty-print the output.
    pub pretty: bool,
}

impl RenderOptions {
    /// The request context these options describe, if any.
    pub fn request(&self) -> Option<RequestContext> {
        if self.no_request {
            return None;
        }
        let user = match &self.user {
            Some(name) => self
                .roles
                .iter()
                .fold(User::authenticated(name), |user, role| user.with_role(role)),
            None => User::anonymous(),
        };
        Some(RequestContext::new(user).with_route("RENDER", "cli"))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Render `data_path` through the root serializer of `schema_path`.
pub async fn handle_render(schema_path: &Path, data_path: &Path, options: &RenderOptions) -> Result<()> {
    let serializer = Schema::load(schema_path)?.build()?;
    let document = load_document(data_path)?;

    info!(
        "rendering {} through '{}'",
        data_path.display(),
        serializer.name()
    );
    let rendered = render_document(&serializer, &document, options.request()).await?;
    println!("{}", format_output(&rendered, options.pretty)?);
    Ok(())
}

/// Validate a schema and print its serializers and fields.
pub fn handle_check(schema_path: &Path) -> Result<()> {
    let schema = Schema::load(schema_path)?;
    let root = schema.build()?;
    let serializers = schema.build_all()?;
    for line in describe_serializers(&serializers, root.name()) {
        println!("{line}");
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Read a JSON document from disk.
pub fn load_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::invalid_data(format!("{}: {e}", path.display())))
}

/// Render `document` (an object or an array of objects) for `request`.
///
/// The request is installed in the task-local scope for the duration of the
/// render; without one the serializer reports a configuration error.
pub async fn render_document(
    serializer: &Serializer,
    document: &Value,
    request: Option<RequestContext>,
) -> Result<Value> {
    match request {
        Some(request) => {
            debug!("rendering as user '{}'", request.user.username);
            scope::with_request(request, async {
                render_in_scope(serializer, document)
            })
            .await
        }
        None => render_in_scope(serializer, document),
    }
}

fn render_in_scope(serializer: &Serializer, document: &Value) -> Result<Value> {
    let context = SerializerContext::from_scope();
    match document {
        Value::Array(items) => serializer.to_representation_many(items, &context),
        instance => serializer.to_representation(instance, &context),
    }
}

fn format_output(value: &Value, pretty: bool) -> Result<String> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(out)
}

/// One line per serializer and field, root first.
pub fn describe_serializers(
    serializers: &BTreeMap<String, Arc<Serializer>>,
    root: &str,
) -> Vec<String> {
    let ordered = serializers
        .get_key_value(root)
        .into_iter()
        .chain(serializers.iter().filter(|(name, _)| name.as_str() != root));

    let mut lines = Vec::new();
    for (name, serializer) in ordered {
        let marker = if name == root { " (root)" } else { "" };
        lines.push(format!("{name}{marker}"));
        for field in serializer.declared_fields().iter() {
            let kind = match field.kind() {
                FieldKind::Attribute => format!("attribute '{}'", field.source_path()),
                FieldKind::Nested(child) => format!("nested {}", child.name()),
                FieldKind::NestedMany(child) => format!("nested many {}", child.name()),
                FieldKind::Computed(_) => "computed".to_string(),
            };
            let access = match field.access_policy() {
                Some(policy) => policy
                    .permissions()
                    .iter()
                    .map(|p| describe_permission(&**p))
                    .collect::<Vec<_>>()
                    .join(" & "),
                None => "public".to_string(),
            };
            lines.push(format!("  {}: {kind} [{access}]", field.name()));
        }
    }
    lines
}
