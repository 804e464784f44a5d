//! `fieldperm` settings.
//!
//! A settings file names the default schema and output style so `render` and
//! `check` can run without flags. Sources are layered with `confyg`: the
//! file found by [`FieldpermConfig::resolve_config_path`] first, then
//! `FIELDPERM_*` variables (`FIELDPERM_SCHEMA_PATH`, `FIELDPERM_OUTPUT_PRETTY`,
//! ...) on top. A missing file is not an error; defaults fill the gaps.

use std::path::PathBuf;

use confyg::{Confygery, env};
use fieldperm_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "FIELDPERM";

/// Variable naming the settings file when `--config` is absent.
pub const CONFIG_PATH_ENV: &str = "FIELDPERM_CONFIG";

const ENV_SECTIONS: [&str; 2] = ["schema", "output"];

/// Settings for the `fieldperm` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldpermConfig {
    /// Shown by `config show` and in logs.
    pub project_name: String,

    /// Where the serializer schema lives.
    pub schema: SchemaConfig,

    /// How rendered documents are printed.
    pub output: OutputConfig,
}

/// `[schema]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Schema file used when `--schema` is not given.
    pub path: Option<String>,
}

/// `[output]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print rendered JSON.
    pub pretty: bool,
}

impl Default for FieldpermConfig {
    fn default() -> Self {
        Self {
            project_name: "fieldperm".to_string(),
            schema: SchemaConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl FieldpermConfig {
    /// Layers the settings file (if it exists) and `FIELDPERM_*` overrides
    /// over the defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut layers = Confygery::new().map_err(confyg_error("setup"))?;

        if let Some(path) = Self::resolve_config_path(config_path).filter(|p| p.exists()) {
            layers
                .add_file(&path.to_string_lossy())
                .map_err(confyg_error("file"))?;
        }

        let mut overrides = env::Options::with_top_level(ENV_PREFIX);
        for section in ENV_SECTIONS {
            overrides.add_section(section);
        }
        layers.add_env(overrides).map_err(confyg_error("environment"))?;

        layers.build().map_err(confyg_error("merge"))
    }

    /// `--config`, else `$FIELDPERM_CONFIG`, else the platform default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        explicit
            .map(PathBuf::from)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .or_else(Self::default_config_path)
    }

    /// `<config dir>/fieldperm/config.toml`, e.g. `~/.config/fieldperm/config.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fieldperm").join("config.toml"))
    }

    /// The schema path to use, preferring an explicit flag.
    pub fn schema_path(&self, explicit: Option<&str>) -> Result<PathBuf> {
        explicit
            .or(self.schema.path.as_deref())
            .map(PathBuf::from)
            .ok_or_else(|| {
                Error::config(
                    "No schema given. Pass --schema <path> or set `schema.path` \
                     (FIELDPERM_SCHEMA_PATH).",
                )
            })
    }

    /// These settings as a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// These settings as the `FIELDPERM_*` variables that would reproduce them.
    pub fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let value = toml::Value::try_from(self).map_err(|e| Error::config(e.to_string()))?;
        let mut vars = Vec::new();
        collect_env_vars(&value, ENV_PREFIX.to_string(), &mut vars);
        Ok(vars)
    }
}

fn confyg_error<E: std::fmt::Display>(stage: &'static str) -> impl FnOnce(E) -> Error {
    move |e| Error::config(format!("Loading settings ({stage}): {e}"))
}

fn collect_env_vars(value: &toml::Value, key: String, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (name, child) in table {
                collect_env_vars(child, format!("{key}_{}", name.to_uppercase()), out);
            }
        }
        scalar => {
            if let Some(text) = env_text(scalar) {
                out.push((key, text));
            }
        }
    }
}

// Arrays are exported as JSON.
fn env_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Array(items) => serde_json::to_string(items).ok(),
        toml::Value::Table(_) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Runs `f` with `key` set to `value` (or unset), restoring it afterwards.
    fn with_env<R>(key: &str, value: Option<&str>, f: impl FnOnce() -> R) -> R {
        let saved = std::env::var(key).ok();
        // SAFETY: each test touching the environment uses its own key.
        unsafe {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
        let out = f();
        // SAFETY: as above.
        unsafe {
            match saved {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
        out
    }

    #[test]
    fn test_config_default() {
        let config = FieldpermConfig::default();
        assert_eq!(config.project_name, "fieldperm");
        assert!(config.schema.path.is_none());
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            project_name = "albums"

            [schema]
            path = "/etc/albums/schema.toml"

            [output]
            pretty = true
        "#;

        let config: FieldpermConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.project_name, "albums");
        assert_eq!(config.schema.path.as_deref(), Some("/etc/albums/schema.toml"));
        assert!(config.output.pretty);
    }

    #[test]
    fn test_config_to_toml() {
        let config = FieldpermConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("project_name = \"fieldperm\""));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("pretty = false"));

        let parsed: FieldpermConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.project_name, config.project_name);
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                project_name = "loaded-app"
                [output]
                pretty = true
            "#,
        )
        .unwrap();

        let config = FieldpermConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.project_name, "loaded-app");
        assert!(config.output.pretty);
    }

    #[test]
    fn test_config_load_defaults() {
        let config = FieldpermConfig::load(Some("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.project_name, "fieldperm");
    }

    #[test]
    fn test_config_load_env_overlay() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                project_name = "file-app"
                [schema]
                path = "from-file.toml"
            "#,
        )
        .unwrap();

        let config = with_env("FIELDPERM_SCHEMA_PATH", Some("from-env.toml"), || {
            FieldpermConfig::load(Some(path.to_str().unwrap())).unwrap()
        });
        assert_eq!(config.schema.path.as_deref(), Some("from-env.toml"));
        assert_eq!(config.project_name, "file-app");
    }

    #[test]
    fn test_resolve_config_path_explicit() {
        let path = FieldpermConfig::resolve_config_path(Some("/explicit/config.toml"));
        assert_eq!(path, Some(PathBuf::from("/explicit/config.toml")));
    }

    #[test]
    fn test_resolve_config_path_env_then_default() {
        // FIELDPERM_CONFIG is only touched here.
        let from_env = with_env(CONFIG_PATH_ENV, Some("/env/config.toml"), || {
            FieldpermConfig::resolve_config_path(None)
        });
        assert_eq!(from_env, Some(PathBuf::from("/env/config.toml")));

        let fallback = with_env(CONFIG_PATH_ENV, None, || {
            FieldpermConfig::resolve_config_path(None)
        });
        assert_eq!(fallback, FieldpermConfig::default_config_path());
        if let Some(path) = fallback {
            assert!(path.ends_with("fieldperm/config.toml"));
        }
    }

    #[test]
    fn test_env_text_scalars() {
        assert_eq!(env_text(&toml::Value::Integer(3)).as_deref(), Some("3"));
        assert_eq!(env_text(&toml::Value::Boolean(true)).as_deref(), Some("true"));
        assert_eq!(env_text(&toml::Value::String("a".into())).as_deref(), Some("a"));
        let items = toml::Value::Array(vec![toml::Value::String("x".into())]);
        assert_eq!(env_text(&items).as_deref(), Some(r#"["x"]"#));
    }

    #[test]
    fn test_schema_path_prefers_explicit() {
        let config = FieldpermConfig {
            schema: SchemaConfig {
                path: Some("configured.toml".into()),
            },
            ..Default::default()
        };
        assert_eq!(
            config.schema_path(Some("flag.toml")).unwrap(),
            PathBuf::from("flag.toml")
        );
        assert_eq!(
            config.schema_path(None).unwrap(),
            PathBuf::from("configured.toml")
        );
    }

    #[test]
    fn test_schema_path_missing() {
        let err = FieldpermConfig::default().schema_path(None).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("--schema"));
    }

    #[test]
    fn test_config_to_env_vars() {
        let config = FieldpermConfig {
            schema: SchemaConfig {
                path: Some("schema.toml".into()),
            },
            ..Default::default()
        };
        let vars: HashMap<_, _> = config.to_env_vars().unwrap().into_iter().collect();
        assert_eq!(vars.get("FIELDPERM_PROJECT_NAME").unwrap(), "fieldperm");
        assert_eq!(vars.get("FIELDPERM_SCHEMA_PATH").unwrap(), "schema.toml");
        assert_eq!(vars.get("FIELDPERM_OUTPUT_PRETTY").unwrap(), "false");
    }

    #[test]
    fn test_config_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FieldpermConfig>();
    }
}
