#![deny(missing_docs)]

//! # Generate Command
//!
//! Runs the full pipeline: schemas are turned into Rust sources, the whole source
//! tree is compiled, and the compiled types are verified.
//!
//! Naming schemas selects the explicit-list mode; omitting them scans the schema
//! root. Per-schema failures are part of the report, not command errors.

use crate::error::CliResult;
use crate::report::{write_report, ReportFormat};
use schemagen_core::{parse_schema_names, CommandExecutor, Pipeline, PipelineConfig, SchemaSelector};
use std::io::Write;

/// Arguments for the generate command.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Comma separated schema names (e.g. `"employee,person"`). Scans the schema
    /// root when omitted.
    #[clap(long)]
    pub schemas: Option<String>,

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

impl GenerateArgs {
    /// The selector implied by `--schemas`.
    pub fn selector(&self) -> SchemaSelector {
        let names = self
            .schemas
            .as_deref()
            .map(parse_schema_names)
            .unwrap_or_default();
        if names.is_empty() {
            SchemaSelector::Scan
        } else {
            SchemaSelector::Names(names)
        }
    }
}

/// Executes a generation run and writes its report to `out`.
///
/// # Arguments
///
/// * `args` - Command arguments.
/// * `config` - Resolved configuration.
/// * `executor` - Runs the compiler and the compiled artifact.
/// * `out` - Where the report goes.
pub fn execute<E: CommandExecutor>(
    args: &GenerateArgs,
    mut config: PipelineConfig,
    executor: E,
    out: &mut impl Write,
) -> CliResult<()> {
    if args.no_verify {
        config.verify = false;
    }
    let pipeline = Pipeline::new(config, executor);
    let report = pipeline.run(&args.selector());
    let format = if args.html {
        ReportFormat::Html
    } else {
        args.format
    };
    write_report(&report, format, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemagen_core::ShellExecutor;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_selector_from_flag() {
        let args = GenerateArgs {
            schemas: Some(" employee , person ".into()),
            ..GenerateArgs::default()
        };
        assert_eq!(
            args.selector(),
            SchemaSelector::Names(vec!["employee".into(), "person".into()])
        );
        assert_eq!(GenerateArgs::default().selector(), SchemaSelector::Scan);
    }

    #[test]
    fn test_report_is_printed_even_when_compilation_fails() {
        let dir = tempdir().unwrap();
        let schemas = dir.path().join("schemas");
        fs::create_dir_all(&schemas).unwrap();
        fs::write(
            schemas.join("employee.json"),
            r#"{"type": "object", "properties": {"name": {"type": "string"}}}"#,
        )
        .unwrap();

        let config = PipelineConfig {
            schema_root: schemas,
            source_root: dir.path().join("output"),
            artifact_root: dir.path().join("build"),
            rustc: "schemagen-missing-rustc".into(),
            ..PipelineConfig::default()
        };
        let args = GenerateArgs {
            schemas: Some("employee,ghost".into()),
            ..GenerateArgs::default()
        };

        let mut out = Vec::new();
        execute(&args, config, ShellExecutor, &mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();

        assert_eq!(
            printed,
            "Schema with name: employee.json successfully processed!\n\
             Schema with name: ghost.json not found!\n\
             Compilation of generated sources failed!\n"
        );
        let unit_dir = dir.path().join("output/employee/com/example");
        assert!(unit_dir.join("employee.rs").exists());
        assert!(unit_dir.join("root_class.rs").exists());
    }
}
