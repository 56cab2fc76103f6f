use crate::error::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while resolving a single placeholder
///
/// Every variant is fatal to the whole resolution pass.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot resolve '${{{name}}}': {}", describe_candidates(.fields, .steps))]
    UnresolvableName {
        name: String,
        fields: Vec<String>,
        steps: Vec<String>,
    },

    #[error("'${{{placeholder}}}' ends on a {kind}; extend the key path to a single value")]
    IncompleteKeyPath {
        placeholder: String,
        kind: &'static str,
    },

    #[error("'${{{placeholder}}}' reaches a {kind} value at '{at}' but continues with '{extra}'")]
    ExtraKeySegments {
        placeholder: String,
        kind: &'static str,
        at: String,
        extra: String,
    },

    #[error("'${{{placeholder}}}': no key '{segment}' (available: {})", list_or_none(.available))]
    KeyNotFound {
        placeholder: String,
        segment: String,
        available: Vec<String>,
    },

    #[error("'${{{placeholder}}}': '{segment}' is not a valid index into a list of {len} items")]
    InvalidIndex {
        placeholder: String,
        segment: String,
        len: usize,
    },

    #[error("'${{{placeholder}}}': 'previous' is not available before any step has completed")]
    InvalidPrevious { placeholder: String },

    #[error("'${{{placeholder}}}': 'tmp' must be followed by exactly 'dir' or 'file'")]
    InvalidTmp { placeholder: String },

    #[error("failed to allocate a temporary {kind} under {}", .root.display())]
    TempAllocation {
        kind: &'static str,
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    pub fn code(&self) -> u16 {
        match self {
            Self::UnresolvableName { .. } => ErrorCode::RESOLVE_UNRESOLVABLE_NAME,
            Self::IncompleteKeyPath { .. } => ErrorCode::RESOLVE_INCOMPLETE_KEY_PATH,
            Self::ExtraKeySegments { .. } => ErrorCode::RESOLVE_EXTRA_KEY_SEGMENTS,
            Self::KeyNotFound { .. } => ErrorCode::RESOLVE_KEY_NOT_FOUND,
            Self::InvalidIndex { .. } => ErrorCode::RESOLVE_INVALID_INDEX,
            Self::InvalidPrevious { .. } => ErrorCode::RESOLVE_INVALID_PREVIOUS,
            Self::InvalidTmp { .. } => ErrorCode::RESOLVE_INVALID_TMP,
            Self::TempAllocation { .. } => ErrorCode::RESOLVE_TEMP_ALLOCATION,
        }
    }
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn describe_candidates(fields: &[String], steps: &[String]) -> String {
    if fields.is_empty() && steps.is_empty() {
        return "no fields or step references are in scope".to_string();
    }
    format!(
        "valid fields are [{}]; valid step references are [{}]",
        fields.join(", "),
        steps.join(", ")
    )
}
