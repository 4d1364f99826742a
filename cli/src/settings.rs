#![deny(missing_docs)]

//! # Settings
//!
//! Resolves the [`PipelineConfig`] for a run: defaults, then the config file, then
//! flags and `SCHEMAGEN_*` environment variables (a `.env` file is honoured).

use crate::error::CliResult;
use schemagen_core::{GenerationMode, PipelineConfig};
use std::path::PathBuf;

/// Options shared by every command.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Config file (`.json`, `.yaml` or `.yml`).
    #[clap(long, global = true, env = "SCHEMAGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory schemas are read from.
    #[clap(long, global = true, env = "SCHEMAGEN_SCHEMA_ROOT")]
    pub schema_root: Option<PathBuf>,

    /// Root of the generated source tree.
    #[clap(long, global = true, env = "SCHEMAGEN_SOURCE_ROOT")]
    pub source_root: Option<PathBuf>,

    /// Directory compiled artifacts are written to.
    #[clap(long, global = true, env = "SCHEMAGEN_ARTIFACT_ROOT")]
    pub artifact_root: Option<PathBuf>,

    /// Dotted namespace of generated types. Pass an empty string for none.
    #[clap(long, global = true, env = "SCHEMAGEN_PACKAGE")]
    pub package: Option<String>,

    /// Compiler executable.
    #[clap(long, global = true, env = "SCHEMAGEN_RUSTC")]
    pub rustc: Option<String>,
}

impl SettingsArgs {
    /// Builds and validates the configuration.
    pub fn resolve(&self) -> CliResult<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(dir) = &self.schema_root {
            config.schema_root = dir.clone();
        }
        if let Some(dir) = &self.source_root {
            config.source_root = dir.clone();
        }
        if let Some(dir) = &self.artifact_root {
            config.artifact_root = dir.clone();
        }
        if let Some(package) = &self.package {
            config.package = package.clone();
        }
        if let Some(rustc) = &self.rustc {
            config.rustc = rustc.clone();
        }

        config.validate()?;
        tracing::debug!(?config, "resolved configuration");
        Ok(config)
    }
}

/// Generation mode as a command line value.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Root type named `RootClass` and left out of compilation.
    ExplicitList,
    /// Root type named after the schema.
    DirectoryScan,
}

impl From<ModeArg> for GenerationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::ExplicitList => GenerationMode::ExplicitList,
            ModeArg::DirectoryScan => GenerationMode::DirectoryScan,
        }
    }
}
