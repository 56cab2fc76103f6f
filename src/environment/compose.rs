//! Pure functions for composing step environments
//!
//! Three layers feed a step's environment, lowest precedence first:
//!
//! 1. host variables admitted by the manifest's allow-list
//! 2. variables declared on the manifest
//! 3. variables declared on the step
//!
//! Composition runs once, before any placeholder is resolved, so the resolver always
//! sees a step's complete (still symbolic) environment. Host values are data, not
//! templates: their keys are recorded as verbatim and the resolver leaves them alone.
//! Apart from the final [`compose_environments`] entry point nothing here touches the
//! manifest.

use crate::error::{ErrorCode, Result, StagehandError};
use crate::manifest::{HostEnvAllowlist, Manifest, Scalar, HOST_ENV_WILDCARD};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use tracing::{debug, warn};

pub type EnvMap = IndexMap<String, Scalar>;

/// Normalize a variable name to UPPER_SNAKE_CASE
pub fn to_env_key(name: &str) -> String {
    name.trim().replace('-', "_").to_uppercase()
}

/// Named allow-list entries a wildcard makes redundant
pub fn wildcard_shadowed(allowlist: &HostEnvAllowlist) -> Vec<&str> {
    if !allowlist.is_wildcard() {
        return Vec::new();
    }
    allowlist
        .entries()
        .iter()
        .map(String::as_str)
        .filter(|e| *e != HOST_ENV_WILDCARD)
        .collect()
}

/// Select the host variables an allow-list admits
///
/// Absent list: nothing. Wildcard: everything, sorted by name. Names are matched exactly;
/// names missing from the host are skipped without complaint.
pub fn host_layer(host: &HashMap<String, String>, allowlist: Option<&HostEnvAllowlist>) -> EnvMap {
    let Some(allowlist) = allowlist else {
        return EnvMap::new();
    };

    if allowlist.is_wildcard() {
        let ignored = wildcard_shadowed(allowlist);
        if !ignored.is_empty() {
            warn!(
                "Host env allow-list combines '{}' with [{}]; the wildcard wins and the names are ignored",
                HOST_ENV_WILDCARD,
                ignored.join(", ")
            );
        }

        let mut names: Vec<&String> = host.keys().collect();
        names.sort();
        return names
            .into_iter()
            .map(|name| (to_env_key(name), Scalar::Str(host[name].clone())))
            .collect();
    }

    allowlist
        .entries()
        .iter()
        .filter_map(|name| match host.get(name) {
            Some(value) => Some((to_env_key(name), Scalar::Str(value.clone()))),
            None => {
                debug!("Host variable '{}' is not set; skipping", name);
                None
            }
        })
        .collect()
}

/// Normalize declared keys, rejecting two names that collapse to the same key
pub fn normalize_declared(declared: &EnvMap, scope: &str) -> Result<EnvMap> {
    let mut normalized = EnvMap::with_capacity(declared.len());
    let mut origins: HashMap<String, &str> = HashMap::new();
    for (name, value) in declared {
        let key = to_env_key(name);
        if let Some(first) = origins.insert(key.clone(), name) {
            return Err(StagehandError::config_with_code(
                ErrorCode::CONFIG_DUPLICATE_ENV_KEY,
                format!(
                    "{}: env names '{}' and '{}' both normalize to '{}'",
                    scope, first, name, key
                ),
            ));
        }
        normalized.insert(key, value.clone());
    }
    Ok(normalized)
}

/// Lay `overrides` over `base`; keys in `overrides` win
pub fn layer(base: &EnvMap, overrides: EnvMap) -> EnvMap {
    let mut merged = base.clone();
    merged.extend(overrides);
    merged
}

/// Keys of a composed map that must pass through resolution untouched
///
/// `inherited` keys keep the mark unless `declared` overrides them. A declared key keeps
/// a mark it already carries in `marked`, so composing a resolved manifest again does not
/// turn host values back into templates.
pub fn verbatim_keys(
    inherited: &IndexSet<String>,
    declared: &EnvMap,
    marked: &IndexSet<String>,
) -> IndexSet<String> {
    inherited
        .iter()
        .filter(|key| !declared.contains_key(*key))
        .chain(declared.keys().filter(|key| marked.contains(*key)))
        .cloned()
        .collect()
}

/// Compose the manifest environment and propagate it into every step
pub fn compose_environments(manifest: &mut Manifest, host: &HashMap<String, String>) -> Result<()> {
    let host_vars = host_layer(host, manifest.host_env.as_ref());
    let host_keys: IndexSet<String> = host_vars.keys().cloned().collect();
    let declared = normalize_declared(&manifest.env, "manifest")?;
    manifest.verbatim_env = verbatim_keys(&host_keys, &declared, &manifest.verbatim_env);
    manifest.env = layer(&host_vars, declared);
    debug!(
        "Composed manifest environment: {} host, {} total",
        host_vars.len(),
        manifest.env.len()
    );

    for (index, step) in manifest.steps.iter_mut().enumerate() {
        let declared = normalize_declared(&step.env, &format!("step '{}'", step.label(index)))?;
        step.verbatim_env = verbatim_keys(&manifest.verbatim_env, &declared, &step.verbatim_env);
        step.env = layer(&manifest.env, declared);
    }
    Ok(())
}
