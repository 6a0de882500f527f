//! CLI argument parsing and command definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// ============================================================================
// CLI argument types
// ============================================================================

/// Enrich pictograms with a multimodal model and build a vector index.
#[derive(Parser, Debug)]
#[command(name = "picto-index", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, global = true, env = "PICTO_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Pipeline commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stage 1: enrich every new image and append it to the ledger.
    Enrich(EnrichArgs),

    /// Stage 2: normalize the ledger and build the vector index.
    Vectorize(VectorizeArgs),

    /// Both stages in sequence.
    Run(RunArgs),

    /// Print version information.
    Version,

    /// Configuration operations.
    Config(ConfigCommand),
}

/// Arguments of `enrich`.
#[derive(Args, Debug, Default)]
pub struct EnrichArgs {
    /// Source directory of pictogram images.
    #[arg(long)]
    pub image_dir: Option<PathBuf>,

    /// Ledger file receiving the raw enrichment records.
    #[arg(long, alias = "output-file")]
    pub ledger: Option<PathBuf>,

    /// Model id to use instead of automatic selection.
    #[arg(short, long)]
    pub model: Option<String>,

    /// Re-enrich images already in the ledger.
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments of `vectorize`.
#[derive(Args, Debug, Default)]
pub struct VectorizeArgs {
    /// Ledger file to read.
    #[arg(long, alias = "input-file")]
    pub ledger: Option<PathBuf>,

    /// Destination directory for the artifacts.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Rebuild even when the existing index is fresh.
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments of `run`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Source directory of pictogram images.
    #[arg(long)]
    pub image_dir: Option<PathBuf>,

    /// Ledger file shared by both stages.
    #[arg(long, alias = "raw-output-file")]
    pub ledger: Option<PathBuf>,

    /// Destination directory for the artifacts.
    #[arg(short, long, alias = "final-output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Model id to use instead of automatic selection.
    #[arg(short, long)]
    pub model: Option<String>,

    /// Re-enrich every image and rebuild the index.
    #[arg(short, long)]
    pub force: bool,
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

    /// Get a configuration value by dotted key.
    Get {
        /// Dotted key (e.g., "vector.backend").
        key: String,
    },

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_cli_args_default() {
        let args = CliArgs::parse_from(["picto-index"]);
        assert!(!args.verbose);
        assert!(!args.quiet);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::parse_from(["picto-index", "vectorize", "-v", "--config", "c.toml"]);
        assert!(args.verbose);
        assert_eq!(args.config.as_deref(), Some("c.toml"));
    }

    #[test]
    fn test_enrich_command() {
        let args = CliArgs::parse_from([
            "picto-index",
            "enrich",
            "--image-dir",
            "/img",
            "--output-file",
            "/tmp/db.json",
            "--model",
            "models/gemini-1.5-flash-latest",
        ]);
        match args.command {
            Some(Command::Enrich(enrich)) => {
                assert_eq!(enrich.image_dir, Some(PathBuf::from("/img")));
                assert_eq!(enrich.ledger, Some(PathBuf::from("/tmp/db.json")));
                assert_eq!(enrich.model.as_deref(), Some("models/gemini-1.5-flash-latest"));
                assert!(!enrich.force);
            }
            _ => panic!("Expected Enrich command"),
        }
    }

    #[test]
    fn test_vectorize_command_force() {
        let args = CliArgs::parse_from([
            "picto-index",
            "vectorize",
            "--input-file",
            "db.json",
            "--output-dir",
            "out",
            "--force",
        ]);
        match args.command {
            Some(Command::Vectorize(vectorize)) => {
                assert_eq!(vectorize.ledger, Some(PathBuf::from("db.json")));
                assert_eq!(vectorize.output_dir, Some(PathBuf::from("out")));
                assert!(vectorize.force);
            }
            _ => panic!("Expected Vectorize command"),
        }
    }

    #[test]
    fn test_run_command() {
        let args = CliArgs::parse_from([
            "picto-index",
            "run",
            "--image-dir",
            "img",
            "--raw-output-file",
            "db.json",
            "--final-output-dir",
            "out",
        ]);
        match args.command {
            Some(Command::Run(run)) => {
                assert_eq!(run.image_dir, Some(PathBuf::from("img")));
                assert_eq!(run.ledger, Some(PathBuf::from("db.json")));
                assert_eq!(run.output_dir, Some(PathBuf::from("out")));
                assert!(run.model.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_config_commands() {
        let args = CliArgs::parse_from(["picto-index", "config", "show"]);
        assert!(matches!(
            args.command,
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Show
            }))
        ));

        let args = CliArgs::parse_from(["picto-index", "config", "get", "vector.backend"]);
        match args.command {
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Get { key },
            })) => assert_eq!(key, "vector.backend"),
            _ => panic!("Expected Config Get command"),
        }
    }

    #[test]
    fn test_version_command() {
        let args = CliArgs::parse_from(["picto-index", "version"]);
        assert!(matches!(args.command, Some(Command::Version)));
    }
}
