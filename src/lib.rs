//! # Stagehand
//!
//! Turns a pipeline manifest into concrete, ready-to-run steps by composing each step's
//! environment and resolving every placeholder in it.
//!
//! ## Usage
//!
//! ```bash
//! stagehand resolve pipeline.yml [--format yaml|json]
//! stagehand env pipeline.yml [--step NAME]
//! ```
//!
//! ## Modules
//!
//! - `app` - Application configuration, logging and fatal error handling for the CLI
//! - `environment` - Host allow-list filtering, env layering and path anchoring
//! - `error` - Unified error type and numeric error codes
//! - `interpolation` - Placeholder engine, reference table and manifest walker
//! - `manifest` - Manifest object tree, loading and validation
pub mod app;
pub mod environment;
pub mod error;
pub mod interpolation;
pub mod manifest;

pub use error::{ErrorCode, StagehandError};
pub use interpolation::{resolve_manifest, ResolveError, ResolveOptions};
pub use manifest::{HostEnvAllowlist, Manifest, Node, Scalar, Step};
