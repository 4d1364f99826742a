//! # Schema Discovery
//!
//! Enumerates schema documents either from an explicit list of names or by scanning
//! the schema root. Read-only.

use crate::error::{AppError, AppResult};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DEFAULT_EXTENSION: &str = "json";

/// A schema document read from disk. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Logical name: the file name with its extension stripped.
    pub name: String,
    /// Where the document was read from.
    pub origin: PathBuf,
    /// Raw document bytes.
    pub content: Vec<u8>,
}

impl Schema {
    /// File name of the origin, used in report lines.
    pub fn file_name(&self) -> String {
        self.origin
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Which schemas a run processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSelector {
    /// Resolve each name against the schema root.
    Names(Vec<String>),
    /// Every regular file directly under the schema root.
    Scan,
}

/// One discovery result. Explicit names can fail individually.
#[derive(Debug)]
pub struct Discovered {
    /// The label used in the report (`employee.json`).
    pub label: String,
    /// The schema, or why it could not be read.
    pub schema: AppResult<Schema>,
}

/// Reads schemas from a schema root.
#[derive(Debug, Clone)]
pub struct SchemaSource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl SchemaSource {
    /// A source reading from `root`. `extensions` filters the directory scan
    /// (without leading dot); empty accepts every regular file.
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
        }
    }

    /// The schema root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists schemas for `selector`.
    ///
    /// Fails as a whole only when the directory scan cannot read the schema root;
    /// missing explicit names are reported per entry as `SchemaNotFound`.
    pub fn list_schemas(&self, selector: &SchemaSelector) -> AppResult<Vec<Discovered>> {
        match selector {
            SchemaSelector::Names(names) => Ok(names
                .iter()
                .map(|name| {
                    let path = self.resolve_name(name);
                    Discovered {
                        label: file_label(&path, name),
                        schema: read_schema(&path),
                    }
                })
                .collect()),
            SchemaSelector::Scan => self.scan(),
        }
    }

    /// Maps a requested name to its lookup location: `employee` becomes
    /// `<root>/employee.json`, names with an extension are used as-is.
    pub fn resolve_name(&self, name: &str) -> PathBuf {
        let requested = Path::new(name);
        if requested.extension().is_some() {
            self.root.join(requested)
        } else {
            self.root.join(format!("{}.{}", name, DEFAULT_EXTENSION))
        }
    }

    fn scan(&self) -> AppResult<Vec<Discovered>> {
        if !self.root.is_dir() {
            return Err(AppError::SchemaNotFound(format!(
                "schema root {:?} is not a directory",
                self.root
            )));
        }

        let mut found = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| {
                AppError::Io(std::io::Error::other(format!(
                    "Failed to scan {:?}: {}",
                    self.root, e
                )))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !self.accepts(path) {
                tracing::debug!(path = %path.display(), "skipping file with unlisted extension");
                continue;
            }
            found.push(Discovered {
                label: file_label(path, ""),
                schema: read_schema(path),
            });
        }
        Ok(found)
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }
}

/// Splits a trigger argument such as `"employee , person"` into schema names.
pub fn parse_schema_names(input: &str) -> Vec<String> {
    // The pattern is a literal; a failure here would be a programming error.
    let Ok(separator) = Regex::new(r"\s*,\s*") else {
        return vec![input.trim().to_string()];
    };
    separator
        .split(input.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_schema(path: &Path) -> AppResult<Schema> {
    let metadata = fs::metadata(path)
        .map_err(|_| AppError::SchemaNotFound(path.display().to_string()))?;
    if !metadata.is_file() {
        return Err(AppError::SchemaNotFound(path.display().to_string()));
    }
    let content = fs::read(path)?;
    Ok(Schema {
        name: logical_name(path),
        origin: path.to_path_buf(),
        content,
    })
}

fn logical_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_label(path: &Path, fallback: &str) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_parse_schema_names() {
        assert_eq!(
            parse_schema_names(" employee ,person,  address "),
            vec!["employee", "person", "address"]
        );
        assert_eq!(parse_schema_names("employee,,person"), vec!["employee", "person"]);
        assert!(parse_schema_names("   ").is_empty());
    }

    #[test]
    fn test_explicit_names_fail_individually() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("employee.json"), "{}").unwrap();

        let source = SchemaSource::new(dir.path(), vec![]);
        let found = source
            .list_schemas(&SchemaSelector::Names(vec![
                "employee".into(),
                "missing".into(),
            ]))
            .unwrap();

        assert_eq!(found.len(), 2);
        let employee = found[0].schema.as_ref().unwrap();
        assert_eq!(employee.name, "employee");
        assert_eq!(employee.content, b"{}");
        assert_eq!(found[1].label, "missing.json");
        assert!(matches!(found[1].schema, Err(AppError::SchemaNotFound(_))));
    }

    #[test]
    fn test_name_with_extension_is_used_verbatim() {
        let source = SchemaSource::new("schemas", vec![]);
        assert_eq!(
            source.resolve_name("person.schema.json"),
            PathBuf::from("schemas/person.schema.json")
        );
        assert_eq!(source.resolve_name("person"), PathBuf::from("schemas/person.json"));
    }

    #[test]
    fn test_directory_is_not_a_schema() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();
        let source = SchemaSource::new(dir.path(), vec![]);
        let found = source
            .list_schemas(&SchemaSelector::Names(vec!["nested".into()]))
            .unwrap();
        assert!(matches!(found[0].schema, Err(AppError::SchemaNotFound(_))));
    }

    #[test]
    fn test_scan_is_flat_sorted_and_regular_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.json"), "{}").unwrap();

        let source = SchemaSource::new(dir.path(), vec![]);
        let found = source.list_schemas(&SchemaSelector::Scan).unwrap();
        let labels: Vec<&str> = found.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["a.json", "b.json", "notes.txt"]);

        let filtered = SchemaSource::new(dir.path(), vec![".json".into()]);
        let found = filtered.list_schemas(&SchemaSelector::Scan).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_scan_missing_root() {
        let dir = tempdir().unwrap();
        let source = SchemaSource::new(dir.path().join("nope"), vec![]);
        assert!(source.list_schemas(&SchemaSelector::Scan).is_err());
    }
}
