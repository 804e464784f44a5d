//! CLI for rendering documents through permission-aware serializers.
//!
//! # Modules
//!
//! - [`cli`]: Argument parsing
//! - [`config`]: `confyg`-backed configuration
//! - [`schema`]: Declarative TOML serializer schemas
//! - [`render_handlers`]: `render` and `check` commands
//! - [`config_handlers`]: `config` subcommands
//! - [`app`]: The application and command dispatch

#![doc = include_str!("../README.md")]

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod render_handlers;
pub mod schema;

pub use app::FieldpermCli;
pub use cli::CliArgs;
pub use config::FieldpermConfig;
pub use schema::Schema;
