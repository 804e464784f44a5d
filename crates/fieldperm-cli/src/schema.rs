//! Declarative serializer schemas.
//!
//! A schema is a TOML document describing one or more serializers and which
//! of them renders the top-level document:
//!
//! ```toml
//! root = "album"
//!
//! [serializers.track]
//! fields = [
//!     { name = "title" },
//!     { name = "duration", permissions = [{ kind = "is_authenticated" }] },
//! ]
//!
//! [serializers.album]
//! fields = [
//!     { name = "album_name" },
//!     { name = "diary", permissions = [{ kind = "owner", attribute = "artist" }] },
//!     { name = "tracks", nested = "track", many = true },
//! ]
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use fieldperm_core::permission::{AllowAny, AllowNone, HasRole, IsAuthenticated, IsOwner};
use fieldperm_core::{Error, Field, FieldPermission, Result, Serializer};
use serde::{Deserialize, Serialize};

/// A parsed schema document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Name of the serializer rendering the top-level document.
    pub root: String,

    /// Serializers by name.
    #[serde(default)]
    pub serializers: BTreeMap<String, SerializerDef>,
}

/// One serializer declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerializerDef {
    /// Fields in output order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// One field declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDef {
    /// Output name.
    pub name: String,

    /// Dotted attribute path, defaults to `name`.
    #[serde(default)]
    pub source: Option<String>,

    /// Render `null` when the attribute is missing.
    #[serde(default)]
    pub optional: bool,

    /// Name of a serializer rendering this field.
    #[serde(default)]
    pub nested: Option<String>,

    /// The nested value is a list.
    #[serde(default)]
    pub many: bool,

    /// Permissions, all of which must pass.
    #[serde(default)]
    pub permissions: Vec<PermissionDef>,
}

/// A permission declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionDef {
    /// Always visible.
    AllowAny,
    /// Never visible.
    AllowNone,
    /// Visible to authenticated callers.
    IsAuthenticated,
    /// Visible to callers holding `role`.
    HasRole {
        /// Required role.
        role: String,
    },
    /// Visible to the caller named by the instance's `attribute`.
    Owner {
        /// Dotted attribute path holding the owner's username.
        attribute: String,
    },
}

impl PermissionDef {
    fn apply(&self, field: Field) -> Field {
        match self {
            Self::AllowAny => field.permission(AllowAny),
            Self::AllowNone => field.permission(AllowNone),
            Self::IsAuthenticated => field.permission(IsAuthenticated),
            Self::HasRole { role } => field.permission(HasRole::new(role)),
            Self::Owner { attribute } => field.permission(IsOwner::new(attribute)),
        }
    }
}

impl Schema {
    /// Parses a schema from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::parse(content, None)
    }

    /// Reads and parses a schema file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, Some(path))
    }

    fn parse(content: &str, origin: Option<&Path>) -> Result<Self> {
        toml::from_str(content).map_err(|e| match origin {
            Some(path) => Error::config(format!("Invalid schema {}: {e}", path.display())),
            None => Error::config(format!("Invalid schema: {e}")),
        })
    }

    /// Builds the root serializer.
    pub fn build(&self) -> Result<Arc<Serializer>> {
        let mut built = BTreeMap::new();
        self.build_one(&self.root, &mut built, &mut Vec::new())
    }

    /// Builds every declared serializer.
    pub fn build_all(&self) -> Result<BTreeMap<String, Arc<Serializer>>> {
        let mut built = BTreeMap::new();
        for name in self.serializers.keys() {
            self.build_one(name, &mut built, &mut Vec::new())?;
        }
        Ok(built)
    }

    fn build_one(
        &self,
        name: &str,
        built: &mut BTreeMap<String, Arc<Serializer>>,
        visiting: &mut Vec<String>,
    ) -> Result<Arc<Serializer>> {
        if let Some(serializer) = built.get(name) {
            return Ok(Arc::clone(serializer));
        }
        if visiting.iter().any(|v| v == name) {
            visiting.push(name.to_string());
            return Err(Error::config(format!(
                "Serializer reference cycle: {}",
                visiting.join(" -> ")
            )));
        }
        let def = self
            .serializers
            .get(name)
            .ok_or_else(|| Error::config(format!("Unknown serializer '{name}'")))?;

        visiting.push(name.to_string());
        let mut builder = Serializer::builder(name);
        for field_def in &def.fields {
            let field = match (&field_def.nested, field_def.many) {
                (Some(child), many) => {
                    let child = self.build_one(child, built, visiting)?;
                    if many {
                        Field::nested_many(&field_def.name, child)
                    } else {
                        Field::nested(&field_def.name, child)
                    }
                }
                (None, true) => {
                    return Err(Error::config(format!(
                        "Field '{}.{}' sets `many` without `nested`",
                        name, field_def.name
                    )));
                }
                (None, false) => Field::attribute(&field_def.name),
            };
            builder = builder.field(configure(field, field_def));
        }
        visiting.pop();

        let serializer = Arc::new(builder.build()?);
        built.insert(name.to_string(), Arc::clone(&serializer));
        Ok(serializer)
    }
}

fn configure(mut field: Field, def: &FieldDef) -> Field {
    if let Some(source) = &def.source {
        field = field.source(source);
    }
    if def.optional {
        field = field.optional();
    }
    def.permissions
        .iter()
        .fold(field, |field, permission| permission.apply(field))
}

/// Describes a permission for `check` output.
pub fn describe_permission(permission: &dyn FieldPermission) -> String {
    format!("{permission:?}")
}
