//! FieldpermCli application.
//!
//! Loads configuration, initialises logging and dispatches commands to the
//! handler modules.

use crate::cli::{BaseCommand, CliArgs, RenderArgs};
use crate::config::FieldpermConfig;
use crate::config_handlers;
use crate::render_handlers::{self, RenderOptions};
use fieldperm_core::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ============================================================================
// FieldpermCli
// ============================================================================

/// The CLI application.
pub struct FieldpermCli {
    name: String,
    config: FieldpermConfig,
    version: String,
}

impl FieldpermCli {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(name: impl Into<String>, args: &CliArgs) -> Result<Self> {
        let config = FieldpermConfig::load(args.config.as_deref())?;
        Ok(Self::new(name, config))
    }

    /// Create a new CLI application.
    pub fn new(name: impl Into<String>, config: FieldpermConfig) -> Self {
        Self {
            name: name.into(),
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &FieldpermConfig {
        &self.config
    }

    /// Initialise tracing-based logging.
    ///
    /// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        // Ignore error if a subscriber is already set (e.g. in tests).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Run the CLI with the given arguments.
    pub async fn run(&self, args: CliArgs) -> Result<()> {
        self.init_logging(args.verbose, args.quiet);

        match args.command {
            Some(BaseCommand::Render(render)) => self.handle_render(render).await,
            Some(BaseCommand::Check { schema }) => {
                let path = self.config.schema_path(schema.as_deref())?;
                render_handlers::handle_check(&path)
            }
            Some(BaseCommand::Version) => {
                println!("{} {}", self.name, self.version);
                Ok(())
            }
            Some(BaseCommand::Config(config_cmd)) => {
                config_handlers::handle_config_command(args.config.as_deref(), config_cmd.command)
            }
            None => {
                println!("{} {} (use --help for usage)", self.name, self.version);
                Ok(())
            }
        }
    }

    async fn handle_render(&self, render: RenderArgs) -> Result<()> {
        let schema_path = self.config.schema_path(render.schema.as_deref())?;
        let data_path = PathBuf::from(&render.data);
        let options = RenderOptions {
            user: render.user,
            roles: render.roles,
            no_request: render.no_request,
            pretty: render.pretty || self.config.output.pretty,
        };
        render_handlers::handle_render(&schema_path, &data_path, &options).await
    }
}

// ============================================================================
// Tests
// ============================================================================
