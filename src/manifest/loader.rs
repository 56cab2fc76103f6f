//! Reading and writing manifests
//!
//! Parsing is plain `serde_yaml`; the only checks done here are the ones resolution
//! depends on (step names must be unique under fuzzy comparison).

use super::Manifest;
use crate::error::{ErrorCode, Result, StagehandError};
use crate::interpolation::fuzzy;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

impl Manifest {
    /// Parse a manifest from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a manifest file, remembering its directory for relative data roots
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            let code = if e.kind() == std::io::ErrorKind::NotFound {
                ErrorCode::CONFIG_NOT_FOUND
            } else {
                ErrorCode::CONFIG_GENERIC
            };
            StagehandError::config_with_code(code, "Cannot read manifest")
                .with_path(path)
                .with_source(e)
        })?;

        let mut manifest = Self::from_yaml_str(&content).map_err(|e| e.with_path(path))?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        manifest.source_dir = Some(std::path::absolute(dir)?);

        debug!(
            "Loaded manifest '{}' with {} steps from {}",
            manifest.name,
            manifest.steps.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Check the invariants resolution relies on
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for step in &self.steps {
            let Some(name) = step.name.as_deref() else {
                continue;
            };
            if let Some(first) = seen.insert(fuzzy::normalize_key(name), name) {
                return Err(StagehandError::config_with_code(
                    ErrorCode::CONFIG_DUPLICATE_STEP_NAME,
                    format!("step names '{}' and '{}' collide", first, name),
                ));
            }
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Scalar, Step};
    use std::path::PathBuf;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
name: ingest
dataRoot: work
hostEnvAllowlist: [HOME]
env:
  region: eu-west-1
steps:
  - name: download
    target: fetch
    env:
      OUTPUT: ${tmp.dir}
  - target: split
    env:
      SOURCE: ${previous.OUTPUT}
"#;

    #[test]
    fn test_parse_manifest_with_camel_case_keys() {
        let manifest = Manifest::from_yaml_str(MANIFEST).unwrap();

        assert_eq!(manifest.name, "ingest");
        assert_eq!(manifest.data_root, PathBuf::from("work"));
        assert_eq!(manifest.host_env.as_ref().unwrap().entries(), &["HOME"]);
        assert_eq!(manifest.env.get("region"), Some(&Scalar::from("eu-west-1")));
        assert_eq!(manifest.steps.len(), 2);
        assert!(manifest.steps[1].name.is_none());
    }

    #[test]
    fn test_data_root_defaults() {
        let manifest = Manifest::from_yaml_str("name: bare").unwrap();
        assert_eq!(manifest.data_root, PathBuf::from("data"));
        assert!(manifest.steps.is_empty());
    }

    #[test]
    fn test_duplicate_step_names_rejected() {
        let manifest = Manifest::new("job")
            .with_step(Step::new("a").named("Fetch-Data"))
            .with_step(Step::new("b").named("fetch_data"));

        let err = manifest.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_DUPLICATE_STEP_NAME);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = Manifest::from_yaml_str("name: [unclosed").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_YAML);
    }

    #[test]
    fn test_load_records_source_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.yml");
        std::fs::write(&path, MANIFEST).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.source_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Manifest::load(Path::new("/nonexistent/stagehand/job.yml")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
        assert!(err.user_message().contains("job.yml"));
    }
}
