#![deny(missing_docs)]

//! # Inspect Command
//!
//! Shows what a schema turns into without writing or compiling anything: the type
//! model as JSON, or the Rust source of every unit.

use crate::error::{CliError, CliResult};
use crate::settings::ModeArg;
use schemagen_core::emitter::{render_unit, unit_file_name};
use schemagen_core::{CommandExecutor, Pipeline, PipelineConfig};
use std::io::Write;

/// Arguments for the inspect command.
#[derive(clap::Args, Debug, Clone)]
pub struct InspectArgs {
    /// Schema name, resolved like the names given to `generate --schemas`.
    pub schema: String,

    /// Naming policy for the root type.
    #[clap(long, value_enum, default_value_t = ModeArg::DirectoryScan)]
    pub mode: ModeArg,

    /// Print the generated Rust source instead of the type model.
    #[clap(long)]
    pub rust: bool,
}

/// Builds the model of one schema and prints it to `out`.
pub fn execute<E: CommandExecutor>(
    args: &InspectArgs,
    config: PipelineConfig,
    executor: E,
    out: &mut impl Write,
) -> CliResult<()> {
    let model = Pipeline::new(config, executor).inspect(&args.schema, args.mode.into())?;

    if args.rust {
        for unit in model.walk() {
            writeln!(out, "// {}", unit_file_name(&unit.name))?;
            writeln!(out, "{}", render_unit(unit)?)?;
        }
    } else {
        let json = serde_json::to_string_pretty(&model)
            .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
        writeln!(out, "{}", json)?;
    }
    Ok(())
}
