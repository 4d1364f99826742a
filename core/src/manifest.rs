//! # Manifests
//!
//! Generation-time metadata replacing runtime introspection.
//!
//! The emitter writes one [`Manifest`] next to each schema's units, listing every
//! generated type and its mutators. The compiler folds the manifests of all
//! compiled units into a [`Registry`] stored beside the artifact, which the
//! verifier uses to resolve probe types and parameter kinds.

use crate::error::{AppError, AppResult};
use crate::model::{ParamKind, TypeModel};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the per-schema manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// File name of the artifact registry.
pub const REGISTRY_FILE: &str = "registry.json";

/// A single-parameter `set_<field>` mutator of a generated type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutatorInfo {
    /// Schema property name.
    pub field: String,
    /// Method name (`set_<ident>`).
    pub setter: String,
    /// Parameter kind.
    pub kind: ParamKind,
}

impl MutatorInfo {
    /// Mutators of every field of `model`, in field order.
    pub fn for_model(model: &TypeModel) -> Vec<Self> {
        model
            .fields
            .iter()
            .map(|f| MutatorInfo {
                field: f.property.clone(),
                setter: f.setter(),
                kind: f.ty.param_kind(),
            })
            .collect()
    }
}

/// One generated unit as listed in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestUnit {
    /// Type name.
    pub type_name: String,
    /// `package.TypeName`.
    pub qualified_name: String,
    /// Path of the unit relative to the manifest's directory.
    pub path: PathBuf,
    /// Mutators of the type.
    pub mutators: Vec<MutatorInfo>,
}

/// Everything generated from one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Logical schema name.
    pub schema: String,
    /// Dotted package of the units.
    pub package: String,
    /// Units in generation (pre-order) order.
    pub units: Vec<ManifestUnit>,
}

impl Manifest {
    /// Reads a manifest file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::General(format!("Invalid manifest {}: {}", path.display(), e))
        })
    }

    /// Writes the manifest as pretty JSON.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::General(format!("Failed to serialize manifest: {}", e)))?;
        fs::write(path, json).map_err(|source| AppError::SourceWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A type the compiled artifact can construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Type name.
    pub type_name: String,
    /// Name the artifact's `construct` registry answers to.
    pub qualified_name: String,
    /// Logical name of the originating schema.
    pub schema: String,
    /// Mutators of the type.
    pub mutators: Vec<MutatorInfo>,
}

/// Index of every type compiled into an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Entries in compilation order, unique by qualified name.
    pub types: Vec<RegistryEntry>,
}

impl Registry {
    /// Reads `<artifact_dir>/registry.json`.
    pub fn load(artifact_dir: &Path) -> AppResult<Self> {
        let path = artifact_dir.join(REGISTRY_FILE);
        let content = fs::read_to_string(&path).map_err(|e| {
            AppError::Verification(format!("Cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::Verification(format!("Invalid registry {}: {}", path.display(), e))
        })
    }

    /// Writes `<artifact_dir>/registry.json`.
    pub fn save(&self, artifact_dir: &Path) -> AppResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::General(format!("Failed to serialize registry: {}", e)))?;
        fs::write(artifact_dir.join(REGISTRY_FILE), json)?;
        Ok(())
    }

    /// Finds a type by qualified name, or by simple name when that is unambiguous.
    pub fn resolve(&self, name: &str) -> Result<&RegistryEntry, String> {
        if let Some(entry) = self.types.iter().find(|e| e.qualified_name == name) {
            return Ok(entry);
        }
        let mut matches = self.types.iter().filter(|e| e.type_name == name);
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Ok(entry),
            (Some(_), Some(_)) => Err(format!(
                "type name '{}' is ambiguous, use its qualified name",
                name
            )),
            (None, _) => Err(format!("type '{}' not found in the artifact", name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn entry(type_name: &str, qualified_name: &str) -> RegistryEntry {
        RegistryEntry {
            type_name: type_name.into(),
            qualified_name: qualified_name.into(),
            schema: "s".into(),
            mutators: vec![MutatorInfo {
                field: "name".into(),
                setter: "set_name".into(),
                kind: ParamKind::String,
            }],
        }
    }

    #[test]
    fn test_resolve_by_qualified_or_unique_simple_name() {
        let registry = Registry {
            types: vec![
                entry("Employee", "models.Employee"),
                entry("Address", "hr.Address"),
                entry("Address", "crm.Address"),
            ],
        };
        assert_eq!(
            registry.resolve("Employee").unwrap().qualified_name,
            "models.Employee"
        );
        assert_eq!(
            registry.resolve("crm.Address").unwrap().qualified_name,
            "crm.Address"
        );
        assert!(registry.resolve("Address").unwrap_err().contains("ambiguous"));
        assert!(registry.resolve("Person").unwrap_err().contains("not found"));
    }

    #[test]
    fn test_registry_file() {
        let dir = tempdir().unwrap();
        let registry = Registry {
            types: vec![entry("Employee", "models.Employee")],
        };
        registry.save(dir.path()).unwrap();

        let raw = fs::read_to_string(dir.path().join(REGISTRY_FILE)).unwrap();
        assert!(raw.contains("\"kind\": \"string\""));
        assert_eq!(Registry::load(dir.path()).unwrap(), registry);
    }

    #[test]
    fn test_missing_registry_is_a_verification_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Registry::load(dir.path()),
            Err(AppError::Verification(_))
        ));
    }
}
