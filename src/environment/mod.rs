//! Environment management for manifest resolution
//!
//! Composes each step's environment from host, manifest and step declarations, and
//! provides the small path helpers resolution needs.

mod compose;
mod path;

pub use compose::{
    compose_environments, host_layer, layer, normalize_declared, to_env_key, verbatim_keys,
    wildcard_shadowed, EnvMap,
};
pub use path::{anchor, expand_home};
