//! CLI argument parsing and command definitions.
//!
//! Global flags (configuration, verbosity) plus the `render`, `check`,
//! `config` and `version` commands.

use clap::{Parser, Subcommand};

// ============================================================================
// CLI argument types
// ============================================================================

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "FIELDPERM_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<BaseCommand>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum BaseCommand {
    /// Render a JSON document through the schema's root serializer.
    Render(RenderArgs),

    /// Validate a schema and list its serializers and fields.
    Check {
        /// Schema file (defaults to `schema.path` from config).
        #[arg(short, long)]
        schema: Option<String>,
    },

    /// Print version information.
    Version,

    /// Configuration operations.
    Config(ConfigCommand),
}

/// Arguments for `render`.
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Schema file (defaults to `schema.path` from config).
    #[arg(short, long)]
    pub schema: Option<String>,

    /// JSON file holding one object or an array of objects.
    #[arg(short, long)]
    pub data: String,

    /// Render as this authenticated user (anonymous when omitted).
    #[arg(short, long)]
    pub user: Option<String>,

    /// Grant a role to the user (repeatable).
    #[arg(short, long = "role")]
    pub roles: Vec<String>,

    /// Render without any request context.
    #[arg(long, conflicts_with_all = ["user", "roles"])]
    pub no_request: bool,

    /// Pretty-print the output.
    #[arg(long)]
    pub pretty: bool,
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Print the effective configuration as TOML.
    Show,

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },

    /// Export configuration as environment variables.
    Export {
        /// Format as Docker --env flags.
        #[arg(long)]
        docker_env: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================
