//! # Pipeline Configuration
//!
//! Every path the pipeline touches is an explicit value in [`PipelineConfig`] and is
//! threaded through each component call; nothing reads ambient state.
//!
//! The two generation modes differ only in data: the [`ModePolicy`] selected for
//! the run decides how the root type is named, whether a synthetic root helper
//! wrapping it is generated, and which helper type is kept out of compilation.

use crate::error::{AppError, AppResult};
use crate::verifier::ProbeSpec;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the wrapper type the explicit-list mode generates around each schema's root.
pub const ROOT_HELPER_NAME: &str = "RootClass";

/// How schemas were selected for a run. Chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// A caller supplied list of schema names.
    ExplicitList,
    /// Every file under the schema root.
    DirectoryScan,
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationMode::ExplicitList => write!(f, "explicit-list"),
            GenerationMode::DirectoryScan => write!(f, "directory-scan"),
        }
    }
}

/// Naming policy for the root type of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootNaming {
    /// Always use this type name.
    Fixed(String),
    /// PascalCase of the schema's logical name.
    FromSchemaName,
}

/// Mode-specific behaviour, expressed as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModePolicy {
    /// How the root type is named.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub root_naming: RootNaming,
    /// Name of a wrapper type generated around the root type, if any.
    #[serde(default)]
    pub root_helper: Option<String>,
    /// Units whose type name equals this are left out of compilation.
    #[serde(default)]
    pub exclude_root_helper: Option<String>,
}

impl ModePolicy {
    /// Policy of the explicit-list mode: root named after the schema, plus a
    /// `RootClass` wrapper that is generated but left out of compilation.
    pub fn explicit_list() -> Self {
        Self {
            root_naming: RootNaming::FromSchemaName,
            root_helper: Some(ROOT_HELPER_NAME.to_string()),
            exclude_root_helper: Some(ROOT_HELPER_NAME.to_string()),
        }
    }

    /// Policy of the directory-scan mode: root named after the schema, no wrapper,
    /// nothing excluded.
    pub fn directory_scan() -> Self {
        Self {
            root_naming: RootNaming::FromSchemaName,
            root_helper: None,
            exclude_root_helper: None,
        }
    }
}

/// All settings of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory the schemas are read from.
    pub schema_root: PathBuf,
    /// Root of the generated source tree.
    pub source_root: PathBuf,
    /// Directory compiled artifacts are written to.
    pub artifact_root: PathBuf,
    /// Dotted namespace of generated types (e.g. `com.example`). May be empty.
    pub package: String,
    /// Extensions accepted by the directory scan. Empty accepts every file.
    pub schema_extensions: Vec<String>,
    /// Compiler executable.
    pub rustc: String,
    /// Edition passed to the compiler.
    pub edition: String,
    /// Whether to run the verifier after a successful compile.
    pub verify: bool,
    /// Deadline for the compiler invocation.
    pub compile_timeout_secs: Option<u64>,
    /// Deadline for the verification run.
    pub verify_timeout_secs: Option<u64>,
    /// Policy used when schemas are named explicitly.
    pub explicit_list: ModePolicy,
    /// Policy used when the schema root is scanned.
    pub directory_scan: ModePolicy,
    /// Types and literal values exercised by the verifier.
    pub probes: ProbeSpec,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema_root: PathBuf::from("schemas"),
            source_root: PathBuf::from("output"),
            artifact_root: PathBuf::from("build"),
            package: "com.example".to_string(),
            schema_extensions: Vec::new(),
            rustc: "rustc".to_string(),
            edition: "2021".to_string(),
            verify: true,
            compile_timeout_secs: None,
            verify_timeout_secs: Some(60),
            explicit_list: ModePolicy::explicit_list(),
            directory_scan: ModePolicy::directory_scan(),
            probes: ProbeSpec::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads a config file. `.yaml`/`.yml` are read as YAML, anything else as JSON.
    /// Missing keys take their defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let config: PipelineConfig = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| AppError::Config(format!("Invalid YAML config: {}", e)))?,
            _ => serde_json::from_str(&content)
                .map_err(|e| AppError::Config(format!("Invalid JSON config: {}", e)))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks values that would otherwise surface as confusing compile errors.
    pub fn validate(&self) -> AppResult<()> {
        let segment = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .map_err(|e| AppError::General(e.to_string()))?;
        for part in self.package_segments() {
            if !segment.is_match(part) {
                return Err(AppError::Config(format!(
                    "Invalid package segment '{}' in '{}'",
                    part, self.package
                )));
            }
        }
        if self.rustc.trim().is_empty() {
            return Err(AppError::Config("Compiler executable is empty".into()));
        }
        Ok(())
    }

    /// The policy applying to `mode`.
    pub fn policy(&self, mode: GenerationMode) -> &ModePolicy {
        match mode {
            GenerationMode::ExplicitList => &self.explicit_list,
            GenerationMode::DirectoryScan => &self.directory_scan,
        }
    }

    /// Package split into its dotted segments; empty package yields nothing.
    pub fn package_segments(&self) -> impl Iterator<Item = &str> {
        self.package.split('.').filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_relative_dirs() {
        let config = PipelineConfig::default();
        assert!(config.schema_root.is_relative());
        assert!(config.source_root.is_relative());
        assert!(config.artifact_root.is_relative());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mode_policies_differ_only_in_data() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.policy(GenerationMode::ExplicitList).exclude_root_helper,
            Some("RootClass".to_string())
        );
        assert_eq!(
            config.policy(GenerationMode::DirectoryScan).root_naming,
            RootNaming::FromSchemaName
        );
        assert!(config
            .policy(GenerationMode::DirectoryScan)
            .exclude_root_helper
            .is_none());
    }

    #[test]
    fn test_explicit_list_keeps_schema_named_root() {
        let policy = ModePolicy::explicit_list();
        assert_eq!(policy.root_naming, RootNaming::FromSchemaName);
        assert_eq!(policy.root_helper.as_deref(), Some(ROOT_HELPER_NAME));
        assert_eq!(policy.exclude_root_helper, policy.root_helper);
        assert!(ModePolicy::directory_scan().root_helper.is_none());
    }

    #[test]
    fn test_root_naming_in_yaml_and_json() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("schemagen.yml");
        fs::write(
            &yaml,
            "explicit_list:\n  root_naming: from_schema_name\n  root_helper: Wrapper\n",
        )
        .unwrap();
        let config = PipelineConfig::load(&yaml).unwrap();
        assert_eq!(config.explicit_list.root_naming, RootNaming::FromSchemaName);
        assert_eq!(config.explicit_list.root_helper.as_deref(), Some("Wrapper"));
        assert!(config.explicit_list.exclude_root_helper.is_none());

        let json = dir.path().join("schemagen.json");
        fs::write(
            &json,
            r#"{"directory_scan": {"root_naming": {"fixed": "Document"}}}"#,
        )
        .unwrap();
        let config = PipelineConfig::load(&json).unwrap();
        assert_eq!(
            config.directory_scan.root_naming,
            RootNaming::Fixed("Document".into())
        );
    }

    #[test]
    fn test_load_yaml_partial() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schemagen.yaml");
        fs::write(
            &path,
            r#"
schema_root: in
package: com.example
verify: false
directory_scan:
  root_naming:
    fixed: Wrapper
  exclude_root_helper: Wrapper
"#,
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.schema_root, PathBuf::from("in"));
        assert_eq!(config.source_root, PathBuf::from("output"));
        assert_eq!(config.package, "com.example");
        assert!(!config.verify);
        assert_eq!(
            config.directory_scan.root_naming,
            RootNaming::Fixed("Wrapper".into())
        );
    }

    #[test]
    fn test_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schemagen.json");
        fs::write(&path, r#"{"artifact_root": "out/bin", "rustc": "rustc-nightly"}"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.artifact_root, PathBuf::from("out/bin"));
        assert_eq!(config.rustc, "rustc-nightly");
    }

    #[test]
    fn test_invalid_package_rejected() {
        let config = PipelineConfig {
            package: "com.my-org".into(),
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(format!("{}", err).contains("my-org"));
    }

    #[test]
    fn test_empty_package_has_no_segments() {
        let config = PipelineConfig {
            package: String::new(),
            ..PipelineConfig::default()
        };
        assert_eq!(config.package_segments().count(), 0);
        assert!(config.validate().is_ok());
    }
}
