//! # Pipeline Orchestrator
//!
//! Sequences one run: DISCOVER → GENERATE (per schema) → COMPILE (whole tree) →
//! VERIFY (optional) → REPORT.
//!
//! Per-schema failures become report lines and never stop the batch. Compilation
//! runs exactly once per run, over everything under the source root, including
//! units left there by earlier runs.

use crate::builder::TypeModelBuilder;
use crate::cancel::CancelToken;
use crate::compiler::{
    ArtifactCompiler, CompilationRequest, CompilationResult, Diagnostic, RustcCompiler,
};
use crate::config::{GenerationMode, PipelineConfig};
use crate::emitter::SourceEmitter;
use crate::error::{AppError, AppResult};
use crate::model::TypeModel;
use crate::source::{Schema, SchemaSelector, SchemaSource};
use crate::toolchain::CommandExecutor;
use crate::verifier::{DynamicVerifier, VerificationOutcome};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Serialises runs within the process; they share output roots.
static RUN_LOCK: Mutex<()> = Mutex::new(());

/// What happened to one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchemaOutcome {
    /// Units were generated.
    Processed {
        /// Written units.
        units: Vec<PathBuf>,
    },
    /// The schema does not exist.
    NotFound,
    /// The document could not be turned into types.
    ParseFailed {
        /// Parser message.
        message: String,
    },
    /// A unit could not be written.
    WriteFailed {
        /// IO message.
        message: String,
    },
    /// Anything else.
    Failed {
        /// Error message.
        message: String,
    },
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaStatus {
    /// Schema file name as requested or found.
    pub label: String,
    /// Outcome.
    pub outcome: SchemaOutcome,
}

impl SchemaStatus {
    fn from_error(label: String, error: AppError) -> Self {
        let outcome = match error {
            AppError::SchemaNotFound(_) => SchemaOutcome::NotFound,
            AppError::SchemaParse { message, .. } => SchemaOutcome::ParseFailed { message },
            e @ AppError::SourceWrite { .. } => SchemaOutcome::WriteFailed {
                message: e.to_string(),
            },
            other => SchemaOutcome::Failed {
                message: other.to_string(),
            },
        };
        Self { label, outcome }
    }

    /// Whether units were generated.
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, SchemaOutcome::Processed { .. })
    }

    /// The report line.
    pub fn line(&self) -> String {
        let label = &self.label;
        match &self.outcome {
            SchemaOutcome::Processed { .. } => {
                format!("Schema with name: {} successfully processed!", label)
            }
            SchemaOutcome::NotFound => format!("Schema with name: {} not found!", label),
            SchemaOutcome::ParseFailed { message } => {
                format!("Schema with name: {} could not be parsed: {}", label, message)
            }
            SchemaOutcome::WriteFailed { message } => {
                format!("Schema with name: {} could not be written: {}", label, message)
            }
            SchemaOutcome::Failed { message } => {
                format!("Schema with name: {} failed: {}", label, message)
            }
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Mode of the run.
    pub mode: GenerationMode,
    /// Per-schema outcomes in discovery order.
    pub schemas: Vec<SchemaStatus>,
    /// The single compilation of the run.
    pub compilation: CompilationResult,
    /// Verification, when enabled and the compile succeeded.
    pub verification: Option<VerificationOutcome>,
}

impl PipelineReport {
    /// Per-schema lines first, compile summary last.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.schemas.iter().map(SchemaStatus::line).collect();
        lines.push(if self.compilation.success {
            "Compilation of generated sources succeeded!".to_string()
        } else {
            "Compilation of generated sources failed!".to_string()
        });
        lines
    }

    /// Lines joined with newlines.
    pub fn render_text(&self) -> String {
        self.lines().join("\n")
    }

    /// Lines joined with `<br />` line breaks, for HTML callers.
    pub fn render_html(&self) -> String {
        self.render_text().replace('\n', "<br />\n")
    }
}

/// Runs the pipeline with one configuration and one command executor.
#[derive(Debug, Clone)]
pub struct Pipeline<E: CommandExecutor> {
    config: PipelineConfig,
    executor: E,
}

impl<E: CommandExecutor> Pipeline<E> {
    /// A pipeline over `config`, running the toolchain and artifacts with `executor`.
    pub fn new(config: PipelineConfig, executor: E) -> Self {
        Self { config, executor }
    }

    /// The configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs a full pipeline for the selected schemas.
    pub fn run(&self, selector: &SchemaSelector) -> PipelineReport {
        let _guard = RUN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        let mode = mode_of(selector);
        tracing::info!("Running pipeline in {} mode", mode);

        let mut schemas = Vec::new();
        match self.source().list_schemas(selector) {
            Ok(found) => {
                for discovered in found {
                    let status = match discovered.schema {
                        Ok(schema) => self.generate(mode, &schema, discovered.label),
                        Err(e) => SchemaStatus::from_error(discovered.label, e),
                    };
                    log_status(&status);
                    schemas.push(status);
                }
            }
            Err(e) => {
                let status = SchemaStatus::from_error(
                    self.config.schema_root.display().to_string(),
                    e,
                );
                log_status(&status);
                schemas.push(status);
            }
        }

        let (compilation, verification) = self.compile_and_verify(mode);
        PipelineReport {
            mode,
            schemas,
            compilation,
            verification,
        }
    }

    /// Recompiles (and verifies) the current source tree without generating.
    pub fn recompile(&self, mode: GenerationMode) -> PipelineReport {
        let _guard = RUN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let (compilation, verification) = self.compile_and_verify(mode);
        PipelineReport {
            mode,
            schemas: Vec::new(),
            compilation,
            verification,
        }
    }

    /// Builds the type model of one schema without writing anything.
    pub fn inspect(&self, name: &str, mode: GenerationMode) -> AppResult<TypeModel> {
        let found = self
            .source()
            .list_schemas(&SchemaSelector::Names(vec![name.to_string()]))?;
        let schema = found
            .into_iter()
            .next()
            .ok_or_else(|| AppError::SchemaNotFound(name.to_string()))?
            .schema?;
        self.builder(mode).build(&schema)
    }

    fn source(&self) -> SchemaSource {
        SchemaSource::new(
            &self.config.schema_root,
            self.config.schema_extensions.clone(),
        )
    }

    fn builder(&self, mode: GenerationMode) -> TypeModelBuilder {
        let policy = self.config.policy(mode);
        TypeModelBuilder::new(self.config.package.clone(), policy.root_naming.clone())
            .with_root_helper(policy.root_helper.clone())
    }

    fn generate(&self, mode: GenerationMode, schema: &Schema, label: String) -> SchemaStatus {
        let output_root = self.config.source_root.join(&schema.name);
        let result = self
            .builder(mode)
            .build(schema)
            .and_then(|model| SourceEmitter::new().emit(&model, &output_root));
        match result {
            Ok(units) => SchemaStatus {
                label,
                outcome: SchemaOutcome::Processed {
                    units: units.into_iter().map(|u| u.path).collect(),
                },
            },
            Err(e) => SchemaStatus::from_error(label, e),
        }
    }

    fn compile_and_verify(
        &self,
        mode: GenerationMode,
    ) -> (CompilationResult, Option<VerificationOutcome>) {
        let policy = self.config.policy(mode);
        let request = CompilationRequest::collect(
            &self.config.source_root,
            &self.config.artifact_root,
            policy.exclude_root_helper.as_deref(),
        );
        let compilation = match request {
            Ok(request) => {
                let compiler =
                    RustcCompiler::new(&self.executor, &self.config.rustc, &self.config.edition);
                let cancel = CancelToken::from_secs(self.config.compile_timeout_secs);
                compiler.compile(&request, &cancel)
            }
            Err(e) => CompilationResult::failed(vec![Diagnostic::error(e.to_string())]),
        };

        if compilation.success {
            tracing::info!("Compilation of generated sources succeeded!");
        } else {
            tracing::warn!(
                errors = compilation.error_count(),
                "Compilation of generated sources failed!"
            );
            for diagnostic in &compilation.diagnostics {
                tracing::debug!("{}", diagnostic);
            }
        }

        let verification = (self.config.verify && compilation.success).then(|| {
            DynamicVerifier::new(&self.executor).verify(
                &self.config.artifact_root,
                &self.config.probes,
                &CancelToken::from_secs(self.config.verify_timeout_secs),
            )
        });
        (compilation, verification)
    }
}

/// The mode implied by how schemas were selected.
pub fn mode_of(selector: &SchemaSelector) -> GenerationMode {
    match selector {
        SchemaSelector::Names(_) => GenerationMode::ExplicitList,
        SchemaSelector::Scan => GenerationMode::DirectoryScan,
    }
}

fn log_status(status: &SchemaStatus) {
    if status.succeeded() {
        tracing::info!("{}", status.line());
    } else {
        tracing::warn!("{}", status.line());
    }
}
