//! Collection of the units to compile from the accumulated source tree.

use crate::error::AppResult;
use crate::manifest::{Manifest, MutatorInfo, MANIFEST_FILE};
use heck::ToPascalCase;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A source file taking part in a compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Path relative to the source root; decides the module the unit is mounted in.
    pub relative: PathBuf,
    /// Type defined by the unit.
    pub type_name: String,
    /// Qualified name the artifact registers the type under.
    pub qualified_name: String,
    /// Originating schema, when a manifest lists the unit.
    pub schema: String,
    /// Mutators, when a manifest lists the unit.
    pub mutators: Vec<MutatorInfo>,
}

/// Everything one compiler invocation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationRequest {
    /// Units to compile, ordered by path.
    pub units: Vec<CompileUnit>,
    /// Units found but left out (the synthetic root helper).
    pub excluded: Vec<CompileUnit>,
    /// Root of the source tree.
    pub source_root: PathBuf,
    /// Where the artifact goes.
    pub artifact_dir: PathBuf,
}

impl CompilationRequest {
    /// Collects every `.rs` unit under `source_root`, including units produced by
    /// earlier runs. Files under `artifact_dir` are never collected.
    ///
    /// A unit whose type name equals `exclude` lands in `excluded`; similar names
    /// (`RootClassifier`) are kept.
    pub fn collect(
        source_root: &Path,
        artifact_dir: &Path,
        exclude: Option<&str>,
    ) -> AppResult<Self> {
        let mut request = Self {
            units: Vec::new(),
            excluded: Vec::new(),
            source_root: source_root.to_path_buf(),
            artifact_dir: artifact_dir.to_path_buf(),
        };
        if !source_root.is_dir() {
            tracing::debug!(root = %source_root.display(), "source root missing, nothing to compile");
            return Ok(request);
        }

        let artifact_abs = absolute(artifact_dir);
        let known = manifests(source_root, &artifact_abs);

        let walker = WalkDir::new(source_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !absolute(e.path()).starts_with(&artifact_abs));

        for entry in walker {
            let entry = entry.map_err(|e| {
                std::io::Error::other(format!("Failed to walk {:?}: {}", source_root, e))
            })?;
            let path = entry.path();
            let is_source = path.extension().and_then(|e| e.to_str()) == Some("rs");
            if !entry.file_type().is_file() || !is_source {
                continue;
            }

            let abs = absolute(path);
            let relative = path
                .strip_prefix(source_root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf());
            let unit = match known.get(&abs) {
                Some(listed) => CompileUnit {
                    path: abs,
                    relative,
                    ..listed.clone()
                },
                None => {
                    let type_name = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_pascal_case())
                        .unwrap_or_default();
                    CompileUnit {
                        path: abs,
                        relative,
                        qualified_name: type_name.clone(),
                        type_name,
                        schema: String::new(),
                        mutators: Vec::new(),
                    }
                }
            };

            if exclude == Some(unit.type_name.as_str()) {
                tracing::debug!(unit = %unit.relative.display(), "excluding root helper");
                request.excluded.push(unit);
            } else {
                request.units.push(unit);
            }
        }

        Ok(request)
    }
}

/// Units listed by every readable manifest under `root`, keyed by absolute path.
fn manifests(root: &Path, artifact_abs: &Path) -> HashMap<PathBuf, CompileUnit> {
    let mut known = HashMap::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !absolute(e.path()).starts_with(artifact_abs))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == MANIFEST_FILE);

    for entry in walker {
        let manifest = match Manifest::load(entry.path()) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Skipping unreadable manifest: {}", e);
                continue;
            }
        };
        let base = entry.path().parent().unwrap_or(root);
        for unit in manifest.units {
            let path = absolute(&base.join(&unit.path));
            known.insert(
                path.clone(),
                CompileUnit {
                    path,
                    relative: unit.path,
                    type_name: unit.type_name,
                    qualified_name: unit.qualified_name,
                    schema: manifest.schema.clone(),
                    mutators: unit.mutators,
                },
            );
        }
    }
    known
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
