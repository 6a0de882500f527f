//! Command-line pipeline for the pictogram index.
//!
//! Wires the two stages together behind a small CLI:
//!
//! - `enrich`: scan images, call the multimodal model, append to the ledger
//! - `vectorize`: normalize the ledger, embed, write the index artifacts
//! - `run`: both, the first feeding the second
//!
//! Configuration is loaded once at startup ([`config::PictoConfig`]) and
//! passed down; providers are built from it in [`app`] and handed to the
//! [`pipeline`] functions.

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod pipeline;

pub use app::PictoCli;
pub use cli::CliArgs;
pub use config::{PathsConfig, PictoConfig};
pub use pipeline::{run_all, run_enrich, run_vectorize, RunSummary, StagePaths};
