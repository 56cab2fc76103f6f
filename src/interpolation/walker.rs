//! Depth-first walk over a manifest
//!
//! The manifest environment is resolved first, with itself as the only container in
//! scope. Steps follow in document order. For each step the walker snapshots the step
//! record, resolves `target`, the `env` map and every extra field, and only then binds
//! the step into the reference table under its name and `previous`. Env keys marked
//! verbatim hold host values and are never rewritten.

use super::engine::InterpolationEngine;
use super::references::ReferenceTable;
use super::scope::Scope;
use crate::error::{Result, StagehandError};
use crate::manifest::value::scalar_map_to_nodes;
use crate::manifest::{Node, Scalar, Step};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info_span};

/// Owns the reference table for one manifest's resolution
pub struct ManifestWalker {
    engine: InterpolationEngine,
    references: ReferenceTable,
}

impl ManifestWalker {
    pub fn new(engine: InterpolationEngine) -> Self {
        Self {
            engine,
            references: ReferenceTable::new(),
        }
    }

    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    /// Resolve the manifest-level environment in place, skipping `verbatim` keys
    pub fn resolve_manifest_env(
        &self,
        env: &mut IndexMap<String, Scalar>,
        verbatim: &IndexSet<String>,
    ) -> Result<()> {
        let mut scope = Scope::new();
        scope.push(scalar_map_to_nodes(env));
        for (key, value) in env.iter_mut() {
            if verbatim.contains(key) {
                continue;
            }
            *value = self
                .resolve_scalar(value, &scope)
                .map_err(|e| StagehandError::resolution(e, None, format!("env.{}", key)))?;
        }
        Ok(())
    }

    /// Resolve all steps in order, binding each once it is complete
    pub fn resolve_steps(&mut self, steps: &mut [Step]) -> Result<()> {
        for (index, step) in steps.iter_mut().enumerate() {
            self.resolve_step(index, step)?;
        }
        Ok(())
    }

    fn resolve_step(&mut self, index: usize, step: &mut Step) -> Result<()> {
        let label = step.label(index);
        let span = info_span!("step", index, name = %label);
        let _guard = span.enter();

        let fail = |field: String| {
            let label = label.clone();
            move |e| StagehandError::resolution(e, Some(label), field)
        };

        let mut scope = Scope::new();
        scope.push(step.to_record());

        step.target = self
            .resolve_scalar(&step.target, &scope)
            .map_err(fail("target".to_string()))?;

        scope.push(scalar_map_to_nodes(&step.env));
        for (key, value) in step.env.iter_mut() {
            if step.verbatim_env.contains(key) {
                continue;
            }
            *value = self
                .resolve_scalar(value, &scope)
                .map_err(fail(format!("env.{}", key)))?;
        }
        scope.pop();

        for (key, node) in step.extra.iter_mut() {
            self.resolve_node(node, &mut scope, key)
                .map_err(|(field, e)| StagehandError::resolution(e, Some(label.clone()), field))?;
        }

        let record = step.to_record();
        if let Some(name) = &step.name {
            self.references.bind(name, record.clone());
        }
        self.references.bind_previous(record);
        debug!("Resolved step {}", label);
        Ok(())
    }

    /// Walk a nested field; maps push a snapshot frame, lists reuse the enclosing one
    fn resolve_node(
        &self,
        node: &mut Node,
        scope: &mut Scope,
        path: &str,
    ) -> std::result::Result<(), (String, super::ResolveError)> {
        match node {
            Node::Scalar(scalar) => {
                *scalar = self
                    .resolve_scalar(scalar, scope)
                    .map_err(|e| (path.to_string(), e))?;
            }
            Node::List(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    self.resolve_node(item, scope, &format!("{}[{}]", path, i))?;
                }
            }
            Node::Map(map) => {
                scope.push(map.clone());
                for (key, child) in map.iter_mut() {
                    self.resolve_node(child, scope, &format!("{}.{}", path, key))?;
                }
                scope.pop();
            }
        }
        Ok(())
    }

    fn resolve_scalar(
        &self,
        value: &Scalar,
        scope: &Scope,
    ) -> std::result::Result<Scalar, super::ResolveError> {
        match value {
            Scalar::Str(text) => self.engine.interpolate(text, scope, &self.references),
            other => Ok(other.clone()),
        }
    }
}
