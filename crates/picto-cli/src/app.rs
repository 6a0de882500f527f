//! The picto-index application: logging setup and command dispatch.

use crate::cli::{CliArgs, Command};
use crate::config::PictoConfig;
use crate::config_handlers;
use crate::pipeline::{self, StagePaths};
use picto_core::Result;
use picto_enrich::{EnrichmentProvider, GeminiProvider};
use picto_vector::{create_embedding_provider, EmbeddingProvider};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// The CLI application, holding the configuration loaded at startup.
pub struct PictoCli {
    name: String,
    config: PictoConfig,
    version: String,
}

impl PictoCli {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(name: impl Into<String>, args: &CliArgs) -> Result<Self> {
        let config = PictoConfig::load(args.config.as_deref())?;
        Ok(Self::new(name, config))
    }

    /// Create a new CLI application.
    pub fn new(name: impl Into<String>, config: PictoConfig) -> Self {
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

    /// The loaded configuration.
    pub fn config(&self) -> &PictoConfig {
        &self.config
    }

    /// Initialise tracing-based logging.
    ///
    /// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
    /// `log` records from the library crates are forwarded to the subscriber.
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
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }

    /// Run the CLI with the given arguments.
    pub async fn run(&self, args: CliArgs) -> Result<()> {
        self.init_logging(args.verbose, args.quiet);

        match args.command {
            Some(Command::Enrich(enrich)) => {
                let config = self.config_with_model(enrich.model);
                let paths = StagePaths::from_config(&config)?
                    .with_images(enrich.image_dir)
                    .with_ledger(enrich.ledger);
                let provider = enrichment_provider(&config)?;
                pipeline::run_enrich(&config, provider, &paths, enrich.force).await?;
                Ok(())
            }
            Some(Command::Vectorize(vectorize)) => {
                let paths = StagePaths::from_config(&self.config)?
                    .with_ledger(vectorize.ledger)
                    .with_output(vectorize.output_dir);
                let provider = embedding_provider(&self.config)?;
                pipeline::run_vectorize(&self.config, provider, &paths, vectorize.force).await?;
                Ok(())
            }
            Some(Command::Run(run)) => {
                let config = self.config_with_model(run.model);
                let paths = StagePaths::from_config(&config)?
                    .with_images(run.image_dir)
                    .with_ledger(run.ledger)
                    .with_output(run.output_dir);
                let enrichment = enrichment_provider(&config)?;
                let embedding = embedding_provider(&config)?;
                pipeline::run_all(&config, enrichment, embedding, &paths, run.force).await?;
                Ok(())
            }
            Some(Command::Version) => {
                println!("{} {}", self.name, self.version);
                Ok(())
            }
            Some(Command::Config(config_cmd)) => {
                config_handlers::handle_config_command(args.config.as_deref(), config_cmd.command)
            }
            None => {
                println!("{} {}: use --help for usage", self.name, self.version);
                Ok(())
            }
        }
    }

    fn config_with_model(&self, model: Option<String>) -> PictoConfig {
        let mut config = self.config.clone();
        if model.is_some() {
            config.enrich.model = model;
        }
        config
    }
}

fn enrichment_provider(config: &PictoConfig) -> Result<Arc<dyn EnrichmentProvider>> {
    Ok(Arc::new(GeminiProvider::from_config(&config.enrich)?))
}

fn embedding_provider(config: &PictoConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    log::info!(
        "Loading embedding provider '{}' ({})",
        config.vector.provider,
        config.vector.model
    );
    create_embedding_provider(&config.vector)
}

// ============================================================================
// Tests
// ============================================================================
