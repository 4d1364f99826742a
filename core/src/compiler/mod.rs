//! # Artifact Compiler
//!
//! Compiles the whole generated source tree into one loadable artifact: a harness
//! binary that can construct every compiled type by qualified name.
//!
//! Compilation never fails as a call. Toolchain errors, invocation failures and
//! cancellation all come back as an unsuccessful [`CompilationResult`] carrying
//! diagnostics.

pub mod diagnostics;
pub mod harness;
mod request;

pub use diagnostics::{Diagnostic, Location, Severity};
pub use harness::Harness;
pub use request::{CompilationRequest, CompileUnit};

use crate::cancel::CancelToken;
use crate::error::AppError;
use crate::toolchain::{CommandExecutor, Invocation};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Crate name of the harness binary.
pub const ARTIFACT_CRATE: &str = "schemagen_artifacts";

/// Outcome of one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationResult {
    /// Whether the toolchain produced the artifact.
    pub success: bool,
    /// Compiler messages, plus messages about the invocation itself.
    pub diagnostics: Vec<Diagnostic>,
    /// The artifact binary, on success.
    pub artifact: Option<PathBuf>,
}

impl CompilationResult {
    /// An unsuccessful result without artifact.
    pub fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            success: false,
            diagnostics,
            artifact: None,
        }
    }

    /// Number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }
}

/// Interface for turning a [`CompilationRequest`] into an artifact.
pub trait ArtifactCompiler {
    /// Compiles `request`. Blocks until the toolchain finishes or `cancel` fires.
    fn compile(&self, request: &CompilationRequest, cancel: &CancelToken) -> CompilationResult;
}

/// Path of the harness binary inside `artifact_dir`.
pub fn artifact_binary(artifact_dir: &Path) -> PathBuf {
    artifact_dir.join(format!("{}{}", ARTIFACT_CRATE, std::env::consts::EXE_SUFFIX))
}

/// Compiles with `rustc` through a [`CommandExecutor`].
#[derive(Debug, Clone)]
pub struct RustcCompiler<E: CommandExecutor> {
    executor: E,
    rustc: String,
    edition: String,
}

impl<E: CommandExecutor> RustcCompiler<E> {
    /// A compiler running `rustc` (path or name on `PATH`) for `edition`.
    pub fn new(executor: E, rustc: impl Into<String>, edition: impl Into<String>) -> Self {
        Self {
            executor,
            rustc: rustc.into(),
            edition: edition.into(),
        }
    }

    fn invocation(&self, harness: &Path, artifact_dir: &Path) -> Invocation {
        Invocation::new(&self.rustc)
            .arg("--edition")
            .arg(&self.edition)
            .arg("--crate-name")
            .arg(ARTIFACT_CRATE)
            .arg("--crate-type")
            .arg("bin")
            .arg("--error-format=json")
            .arg("--out-dir")
            .arg(artifact_dir)
            .arg(harness)
    }
}

impl<E: CommandExecutor> ArtifactCompiler for RustcCompiler<E> {
    fn compile(&self, request: &CompilationRequest, cancel: &CancelToken) -> CompilationResult {
        let artifact_dir = &request.artifact_dir;
        let harness_dir = artifact_dir.join("harness");
        if let Err(e) = fs::create_dir_all(&harness_dir) {
            return CompilationResult::failed(vec![Diagnostic::error(format!(
                "Cannot create {}: {}",
                harness_dir.display(),
                e
            ))]);
        }

        let harness = match harness::render(&request.units) {
            Ok(h) => h,
            Err(e) => return CompilationResult::failed(vec![Diagnostic::error(e.to_string())]),
        };
        let harness_path = harness_dir.join("main.rs");
        if let Err(e) = fs::write(&harness_path, &harness.source) {
            return CompilationResult::failed(vec![Diagnostic::error(format!(
                "Cannot write {}: {}",
                harness_path.display(),
                e
            ))]);
        }
        if let Err(e) = harness.registry.save(artifact_dir) {
            return CompilationResult::failed(vec![Diagnostic::error(e.to_string())]);
        }

        // A stale binary must never stand in for this request's artifact.
        let binary = artifact_binary(artifact_dir);
        if binary.exists() {
            if let Err(e) = fs::remove_file(&binary) {
                tracing::warn!("Failed to remove stale artifact {}: {}", binary.display(), e);
            }
        }

        tracing::info!(
            units = request.units.len(),
            excluded = request.excluded.len(),
            "compiling generated sources"
        );
        let invocation = self.invocation(&harness_path, artifact_dir);
        let output = match self.executor.execute(&invocation, cancel) {
            Ok(output) => output,
            Err(AppError::Cancelled(reason)) => {
                return CompilationResult::failed(vec![Diagnostic::error(format!(
                    "Compilation cancelled: {}",
                    reason
                ))])
            }
            Err(e) => return CompilationResult::failed(vec![Diagnostic::error(e.to_string())]),
        };

        let mut diagnostics = diagnostics::parse(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            if !diagnostics.iter().any(|d| d.severity == Severity::Error) {
                diagnostics.push(Diagnostic::error(format!(
                    "{} exited with {}",
                    self.rustc, output.status
                )));
            }
            return CompilationResult::failed(diagnostics);
        }

        CompilationResult {
            success: true,
            diagnostics,
            artifact: Some(binary),
        }
    }
}
