//! Structured compiler diagnostics, parsed from `--error-format=json` output.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Compilation cannot succeed.
    Error,
    /// Suspicious but accepted.
    Warning,
    /// Extra information.
    Note,
    /// Suggested fix.
    Help,
}

/// Where a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Source file.
    pub path: PathBuf,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
}

/// One message of the compiler (or about the compiler invocation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Message text.
    pub message: String,
    /// Primary location, when the message has one.
    pub location: Option<Location>,
}

impl Diagnostic {
    /// An error without location.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            location: None,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Help => "help",
        };
        match &self.location {
            Some(loc) => write!(
                f,
                "{}:{}:{}: {}: {}",
                loc.path.display(),
                loc.line,
                loc.column,
                severity,
                self.message
            ),
            None => write!(f, "{}: {}", severity, self.message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDiagnostic {
    #[serde(rename = "$message_type")]
    message_type: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    level: String,
    #[serde(default)]
    spans: Vec<RawSpan>,
}

#[derive(Debug, Deserialize)]
struct RawSpan {
    file_name: String,
    line_start: usize,
    column_start: usize,
    #[serde(default)]
    is_primary: bool,
}

/// Parses the compiler's stderr. JSON diagnostics are mapped one to one; any other
/// non-empty line is kept as a note.
pub fn parse(stderr: &str) -> Vec<Diagnostic> {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<RawDiagnostic>(line) {
            Ok(raw) => from_raw(raw),
            Err(_) => Some(Diagnostic {
                severity: Severity::Note,
                message: line.to_string(),
                location: None,
            }),
        })
        .collect()
}

fn from_raw(raw: RawDiagnostic) -> Option<Diagnostic> {
    if raw.message_type.as_deref().is_some_and(|t| t != "diagnostic") {
        return None;
    }
    let severity = match raw.level.as_str() {
        "warning" => Severity::Warning,
        "note" | "failure-note" => Severity::Note,
        "help" => Severity::Help,
        _ => Severity::Error,
    };
    let location = raw
        .spans
        .iter()
        .find(|s| s.is_primary)
        .or_else(|| raw.spans.first())
        .map(|span| Location {
            path: PathBuf::from(&span.file_name),
            line: span.line_start,
            column: span.column_start,
        });
    Some(Diagnostic {
        severity,
        message: raw.message,
        location,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_error_with_primary_span() {
        let stderr = r#"{"$message_type":"diagnostic","message":"cannot find type `Adress` in module `super`","code":{"code":"E0412","explanation":null},"level":"error","spans":[{"file_name":"/out/models/employee.rs","byte_start":10,"byte_end":16,"line_start":7,"line_end":7,"column_start":23,"column_end":29,"is_primary":true,"text":[],"label":null,"suggested_replacement":null,"suggestion_applicability":null,"expansion":null}],"children":[],"rendered":"error[E0412]: ..."}
{"$message_type":"diagnostic","message":"aborting due to 1 previous error","code":null,"level":"error","spans":[],"children":[],"rendered":"error: aborting due to 1 previous error\n\n"}"#;

        let diagnostics = parse(stderr);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics[0],
            Diagnostic {
                severity: Severity::Error,
                message: "cannot find type `Adress` in module `super`".into(),
                location: Some(Location {
                    path: PathBuf::from("/out/models/employee.rs"),
                    line: 7,
                    column: 23,
                }),
            }
        );
        assert!(diagnostics[1].location.is_none());
        assert_eq!(
            diagnostics[0].to_string(),
            "/out/models/employee.rs:7:23: error: cannot find type `Adress` in module `super`"
        );
    }

    #[test]
    fn test_levels_and_plain_lines() {
        let stderr = "{\"message\":\"unused\",\"level\":\"warning\",\"spans\":[]}\n\
                      {\"$message_type\":\"artifact\",\"artifact\":\"x\",\"emit\":\"link\"}\n\
                      thread 'rustc' panicked\n\n";
        let diagnostics = parse(stderr);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[1].severity, Severity::Note);
        assert_eq!(diagnostics[1].message, "thread 'rustc' panicked");
        assert!(parse("").is_empty());
    }
}
