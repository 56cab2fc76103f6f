//! Value types flowing through manifests
//!
//! Every leaf of a manifest is a [`Scalar`]; records and lists around the leaves are
//! [`Node`]s. Placeholders always resolve to a `Scalar`, never to a subtree.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete leaf value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Borrow the string contents if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "string",
        }
    }
}

/// Magnitudes outside this range render in exponent form
const PLAIN_FLOAT_RANGE: std::ops::Range<f64> = 1e-5..1e16;

/// Text form used when a value is spliced into a longer string.
///
/// Floats with no fractional part keep a trailing `.0` so `2.0` never reads as `2`.
/// Very large or very small magnitudes use exponent form (`1e300`).
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x)
                if x.is_finite() && *x != 0.0 && !PLAIN_FLOAT_RANGE.contains(&x.abs()) =>
            {
                write!(f, "{:e}", x)
            }
            Scalar::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// A node of the manifest tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Scalar(Scalar),
    List(Vec<Node>),
    Map(IndexMap<String, Node>),
}

impl Node {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Scalar(s) => s.kind(),
            Node::List(_) => "list",
            Node::Map(_) => "record",
        }
    }
}

impl From<Scalar> for Node {
    fn from(value: Scalar) -> Self {
        Node::Scalar(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Scalar(value.into())
    }
}

/// Lift an env-style map of scalars into a record node map
pub fn scalar_map_to_nodes(map: &IndexMap<String, Scalar>) -> IndexMap<String, Node> {
    map.iter()
        .map(|(k, v)| (k.clone(), Node::Scalar(v.clone())))
        .collect()
}
