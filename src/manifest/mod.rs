//! Manifest object tree
//!
//! A manifest names a job, the data root its ephemeral resources live under, the host
//! variables it may inherit, its own environment and the ordered list of steps to run.
//! Loading and validation live in [`loader`]; resolution lives in
//! [`crate::interpolation`].

pub mod loader;
pub mod value;

pub use value::{Node, Scalar};

use crate::interpolation::fuzzy;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Token that opts a manifest into inheriting every host variable
pub const HOST_ENV_WILDCARD: &str = "*";

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A job manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,

    /// Root for everything the job writes; made absolute before resolution
    #[serde(default = "default_data_root", alias = "dataRoot")]
    pub data_root: PathBuf,

    /// Host variables the job may inherit
    #[serde(
        default,
        alias = "hostEnvAllowlist",
        skip_serializing_if = "Option::is_none"
    )]
    pub host_env: Option<HostEnvAllowlist>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, Scalar>,

    #[serde(default)]
    pub steps: Vec<Step>,

    /// Directory of the manifest file, when loaded from disk
    #[serde(skip)]
    pub source_dir: Option<PathBuf>,

    /// Env keys holding host values; resolution passes them through untouched
    #[serde(skip)]
    pub verbatim_env: IndexSet<String>,
}

impl Manifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_root: default_data_root(),
            host_env: None,
            env: IndexMap::new(),
            steps: Vec::new(),
            source_dir: None,
            verbatim_env: IndexSet::new(),
        }
    }

    pub fn with_data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.data_root = data_root.into();
        self
    }

    pub fn with_host_env(mut self, allowlist: HostEnvAllowlist) -> Self {
        self.host_env = Some(allowlist);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Position of the step called `name`, case and dash insensitive
    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|step| {
            step.name
                .as_deref()
                .is_some_and(|own| fuzzy::keys_match(own, name))
        })
    }

    /// Find a step by name, case and dash insensitive
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.step_index(name).map(|index| &self.steps[index])
    }
}

/// Host variable allow-list: explicit names, or the `*` wildcard
///
/// Accepts either a single string or a list in YAML. The raw entries are kept so the
/// environment composer can report names that a wildcard makes redundant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AllowlistRepr", into = "AllowlistRepr")]
pub struct HostEnvAllowlist {
    entries: Vec<String>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum AllowlistRepr {
    One(String),
    Many(Vec<String>),
}

impl From<AllowlistRepr> for HostEnvAllowlist {
    fn from(repr: AllowlistRepr) -> Self {
        match repr {
            AllowlistRepr::One(entry) => Self {
                entries: vec![entry],
            },
            AllowlistRepr::Many(entries) => Self { entries },
        }
    }
}

impl From<HostEnvAllowlist> for AllowlistRepr {
    fn from(list: HostEnvAllowlist) -> Self {
        match list.entries.as_slice() {
            [single] if single == HOST_ENV_WILDCARD => AllowlistRepr::One(single.clone()),
            _ => AllowlistRepr::Many(list.entries),
        }
    }
}

impl HostEnvAllowlist {
    pub fn wildcard() -> Self {
        Self {
            entries: vec![HOST_ENV_WILDCARD.to_string()],
        }
    }

    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.entries.iter().any(|e| e == HOST_ENV_WILDCARD)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// One unit of work in a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// External command to invoke
    pub target: Scalar,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, Scalar>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,

    /// Any other fields; walked by the resolver like the rest of the step
    #[serde(flatten)]
    pub extra: IndexMap<String, Node>,

    /// Env keys holding host values; resolution passes them through untouched
    #[serde(skip)]
    pub verbatim_env: IndexSet<String>,
}

impl Step {
    pub fn new(target: impl Into<Scalar>) -> Self {
        Self {
            name: None,
            target: target.into(),
            env: IndexMap::new(),
            skip: false,
            extra: IndexMap::new(),
            verbatim_env: IndexSet::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Node>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Label used in logs and errors: the name, or the position for unnamed steps
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{}", index + 1),
        }
    }

    /// Record view of the step, as seen by placeholder lookups
    pub fn to_record(&self) -> IndexMap<String, Node> {
        let mut record = IndexMap::new();
        if let Some(name) = &self.name {
            record.insert("name".to_string(), Node::from(name.as_str()));
        }
        record.insert("target".to_string(), Node::Scalar(self.target.clone()));
        record.insert(
            "env".to_string(),
            Node::Map(value::scalar_map_to_nodes(&self.env)),
        );
        record.insert("skip".to_string(), Node::Scalar(Scalar::Bool(self.skip)));
        for (key, node) in &self.extra {
            record.insert(key.clone(), node.clone());
        }
        record
    }
}
