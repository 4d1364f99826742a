#![deny(missing_docs)]

//! # Compile Command
//!
//! Recompiles the generated source tree as it is, without reading any schema,
//! and verifies the result unless told otherwise.

use crate::error::CliResult;
use crate::report::{write_report, ReportFormat};
use crate::settings::ModeArg;
use schemagen_core::{CommandExecutor, Pipeline, PipelineConfig};
use std::io::Write;

/// Arguments for the compile command.
#[derive(clap::Args, Debug, Clone)]
pub struct CompileArgs {
    /// Policy deciding whether the root helper type is compiled.
    #[clap(long, value_enum, default_value_t = ModeArg::DirectoryScan)]
    pub mode: ModeArg,

    /// Skip the verification step.
    #[clap(long)]
    pub no_verify: bool,

    /// How the report is printed.
    #[clap(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Shorthand for `--format html`.
    #[clap(long, conflicts_with = "format")]
    pub html: bool,
}

/// Executes a recompilation and writes its report to `out`.
pub fn execute<E: CommandExecutor>(
    args: &CompileArgs,
    mut config: PipelineConfig,
    executor: E,
    out: &mut impl Write,
) -> CliResult<()> {
    if args.no_verify {
        config.verify = false;
    }
    let report = Pipeline::new(config, executor).recompile(args.mode.into());
    let format = if args.html {
        ReportFormat::Html
    } else {
        args.format
    };
    write_report(&report, format, out)
}
