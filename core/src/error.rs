//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the workspace.
//!
//! The per-schema variants (`SchemaNotFound`, `SchemaParse`, `SourceWrite`) are
//! recoverable: the pipeline turns them into report lines and moves on to the
//! next schema.

use derive_more::{Display, From};
use std::path::PathBuf;

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// A requested schema does not exist in the schema root.
    #[from(ignore)]
    #[display("Schema not found: {_0}")]
    SchemaNotFound(String),

    /// A schema document could not be turned into a type model.
    #[from(ignore)]
    #[display("Schema '{name}' could not be parsed: {message}")]
    SchemaParse {
        /// Logical name of the schema.
        name: String,
        /// What went wrong.
        message: String,
    },

    /// A generated unit (or manifest) could not be written.
    #[from(ignore)]
    #[display("Failed to write {}: {source}", path.display())]
    SourceWrite {
        /// Target file.
        path: PathBuf,
        /// Underlying IO failure.
        source: std::io::Error,
    },

    /// The external toolchain could not be invoked at all.
    #[from(ignore)]
    #[display("Compiler invocation failed: {_0}")]
    CompileInvocation(String),

    /// The compiled artifact could not be loaded or driven.
    #[from(ignore)]
    #[display("Verification failed: {_0}")]
    Verification(String),

    /// Invalid configuration values or an unreadable config file.
    #[from(ignore)]
    #[display("Configuration Error: {_0}")]
    Config(String),

    /// A subprocess was stopped by its cancellation token or deadline.
    #[from(ignore)]
    #[display("Cancelled: {_0}")]
    Cancelled(String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Shorthand for a [`AppError::SchemaParse`] on schema `name`.
    pub fn parse(name: &str, message: impl Into<String>) -> Self {
        AppError::SchemaParse {
            name: name.to_string(),
            message: message.into(),
        }
    }
}
