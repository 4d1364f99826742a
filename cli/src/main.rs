#![deny(missing_docs)]

//! # schemagen CLI
//!
//! Command Line Interface for the JSON Schema to Rust pipeline.
//!
//! Supported Commands:
//! - `generate`: Schema -> Rust sources -> compiled artifact -> verification.
//! - `compile`: Recompiles (and verifies) the existing source tree.
//! - `inspect`: Prints the type model or generated source of one schema.
//!
//! A run that produces a report always exits successfully; failures of individual
//! schemas, of the compiler or of verification are part of the report.

use clap::{Parser, Subcommand};
use schemagen_core::ShellExecutor;
use tracing_subscriber::EnvFilter;

use crate::error::CliResult;

mod compile;
mod error;
mod generate;
mod inspect;
mod report;
mod settings;

#[derive(Parser, Debug)]
#[clap(author, version, about = "JSON Schema to Rust pipeline")]
struct Cli {
    #[clap(flatten)]
    settings: settings::SettingsArgs,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate, compile and verify Rust types for schemas.
    Generate(generate::GenerateArgs),
    /// Recompile the generated source tree without reading schemas.
    Compile(compile::CompileArgs),
    /// Print the type model of one schema.
    Inspect(inspect::InspectArgs),
}

fn main() -> CliResult<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.settings.resolve()?;
    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Commands::Generate(args) => generate::execute(args, config, ShellExecutor, &mut stdout)?,
        Commands::Compile(args) => compile::execute(args, config, ShellExecutor, &mut stdout)?,
        Commands::Inspect(args) => inspect::execute(args, config, ShellExecutor, &mut stdout)?,
    }

    Ok(())
}
