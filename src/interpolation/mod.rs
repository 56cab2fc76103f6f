//! Placeholder resolution for manifests
//!
//! [`resolve_manifest`] is the single entry point: it anchors the data root, composes
//! environments, then walks the manifest once, rewriting every string that contains a
//! placeholder. Resolution is fail-fast; the first error aborts the pass and the
//! manifest is left in an unspecified, partially rewritten state.
//!
//! # Placeholders
//!
//! | Form                       | Value                                          |
//! |----------------------------|------------------------------------------------|
//! | `${data}`                  | the absolute data root                         |
//! | `${tmp.dir}`/`${tmp.file}` | a freshly created directory or empty file      |
//! | `${FIELD}`                 | a field of the enclosing container(s)          |
//! | `${previous.key.path}`     | a value from the step just completed           |
//! | `${step-name.key.path}`    | a value from an earlier named step             |
//! | `$$`                       | a literal `$`                                  |

pub mod engine;
mod error;
pub mod fuzzy;
pub mod references;
pub mod scope;
pub mod temp;
pub mod walker;

pub use engine::InterpolationEngine;
pub use error::ResolveError;
pub use references::{ReferenceTable, StepRecord, PREVIOUS};
pub use scope::Scope;
pub use temp::TempAllocator;
pub use walker::ManifestWalker;

use crate::environment::{anchor, compose_environments};
use crate::error::{ErrorCode, Result, StagehandError};
use crate::manifest::Manifest;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, info_span};

/// Inputs to a resolution pass that do not come from the manifest itself
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Snapshot of the host environment
    pub host_env: HashMap<String, String>,
    /// Directory relative data roots are anchored to; overrides the manifest's own location
    pub base_dir: Option<PathBuf>,
}

impl ResolveOptions {
    /// Options using the current process environment
    pub fn from_process() -> Self {
        Self {
            host_env: std::env::vars().collect(),
            base_dir: None,
        }
    }

    pub fn with_host_env(mut self, host_env: HashMap<String, String>) -> Self {
        self.host_env = host_env;
        self
    }

    pub fn with_host_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.host_env.insert(key.into(), value.into());
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }
}

/// Resolve every placeholder in `manifest`, in place
pub fn resolve_manifest(manifest: &mut Manifest, options: &ResolveOptions) -> Result<()> {
    let span = info_span!("resolve", manifest = %manifest.name);
    let _guard = span.enter();

    manifest.validate()?;

    let base = match options.base_dir.as_ref().or(manifest.source_dir.as_ref()) {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let data_root = anchor(&manifest.data_root, &base)?;
    std::fs::create_dir_all(&data_root).map_err(|e| {
        StagehandError::storage_with_code(
            ErrorCode::STORAGE_IO_ERROR,
            "Cannot create data root",
            Some(data_root.clone()),
        )
        .with_source(e)
    })?;
    manifest.data_root = data_root.clone();

    compose_environments(manifest, &options.host_env)?;

    let mut walker = ManifestWalker::new(InterpolationEngine::new(data_root));
    walker.resolve_manifest_env(&mut manifest.env, &manifest.verbatim_env)?;
    walker.resolve_steps(&mut manifest.steps)?;

    info!(
        "Resolved manifest '{}': {} steps, data root {}",
        manifest.name,
        manifest.steps.len(),
        manifest.data_root.display()
    );
    Ok(())
}
