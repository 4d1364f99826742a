#![deny(missing_docs)]

//! # schemagen core
//!
//! Turns JSON Schema documents into generated Rust data types, compiles them into a
//! loadable artifact, and verifies the compiled types by constructing instances and
//! invoking their mutators.
//!
//! The pipeline is `SchemaSource` → `TypeModelBuilder` → `SourceEmitter` →
//! `ArtifactCompiler` → `DynamicVerifier`, sequenced by [`Pipeline`].

/// Shared error types.
pub mod error;

/// Cancellation tokens for blocking subprocess calls.
pub mod cancel;

/// Run configuration and per-mode policies.
pub mod config;

/// Schema discovery.
pub mod source;

/// The in-memory type model.
pub mod model;

/// JSON Schema interpretation.
pub mod builder;

/// Generation-time manifests and the artifact registry.
pub mod manifest;

/// Rust source generation.
pub mod emitter;

/// External process execution.
pub mod toolchain;

/// Compilation of the generated tree.
pub mod compiler;

/// Line protocol spoken with compiled artifacts.
pub mod protocol;

/// Verification of compiled artifacts.
pub mod verifier;

/// Orchestration of a run.
pub mod pipeline;

pub use builder::TypeModelBuilder;
pub use cancel::CancelToken;
pub use compiler::{
    ArtifactCompiler, CompilationRequest, CompilationResult, Diagnostic, RustcCompiler, Severity,
};
pub use config::{GenerationMode, ModePolicy, PipelineConfig, RootNaming, ROOT_HELPER_NAME};
pub use emitter::{EmittedUnit, SourceEmitter};
pub use error::{AppError, AppResult};
pub use model::{Field, FieldType, ParamKind, TypeModel};
pub use pipeline::{Pipeline, PipelineReport, SchemaOutcome, SchemaStatus};
pub use source::{parse_schema_names, Schema, SchemaSelector, SchemaSource};
pub use toolchain::{CommandExecutor, Invocation, ShellExecutor};
pub use verifier::{
    DynamicVerifier, ProbeSpec, ProbeValue, TypeOutcome, TypeProbe, VerificationOutcome,
};
