use std::path::PathBuf;
use thiserror::Error;

use crate::interpolation::ResolveError;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The unified error type for manifest loading and resolution
#[derive(Error, Debug)]
pub enum StagehandError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Storage error: {message}")]
    Storage {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Resolution error in {location}: {source}")]
    Resolution {
        code: u16,
        location: String,
        step: Option<String>,
        field: String,
        #[source]
        source: ResolveError,
    },
}

impl StagehandError {
    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create a storage error with specific code and path
    pub fn storage_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Wrap a resolver failure with the step and field it happened in.
    ///
    /// `step` is `None` for fields of the manifest itself.
    pub fn resolution(source: ResolveError, step: Option<String>, field: impl Into<String>) -> Self {
        let field = field.into();
        let location = match &step {
            Some(step) => format!("step '{}', field '{}'", step, field),
            None => format!("manifest field '{}'", field),
        };
        Self::Resolution {
            code: source.code(),
            location,
            step,
            field,
            source,
        }
    }

    /// Attach the file a configuration or storage error refers to
    pub fn with_path(mut self, new_path: impl Into<PathBuf>) -> Self {
        match &mut self {
            Self::Config { path, .. } | Self::Storage { path, .. } => {
                *path = Some(new_path.into());
            }
            Self::Resolution { .. } => {}
        }
        self
    }

    /// Add a source error to this error
    ///
    /// Resolution errors already carry their resolver cause and are left unchanged.
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. } | Self::Storage { source: src, .. } => {
                *src = Some(source.into());
            }
            Self::Resolution { .. } => {}
        }
        self
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Storage { .. } => 4,
            Self::Resolution { .. } => 6,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Storage { code, .. }
            | Self::Resolution { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, path, .. } => {
                if let Some(p) = path {
                    format!("Manifest problem in {}: {}", p.display(), message)
                } else {
                    format!("Manifest problem: {}", message)
                }
            }
            Self::Storage { message, path, .. } => {
                if let Some(p) = path {
                    format!("Storage error at {}: {}", p.display(), message)
                } else {
                    format!("Storage error: {}", message)
                }
            }
            Self::Resolution {
                step,
                field,
                source,
                ..
            } => {
                let mut msg = String::from("Could not resolve placeholders");
                if let Some(s) = step {
                    msg.push_str(&format!(" in step '{}'", s));
                }
                format!("{} (field '{}'): {}", msg, field, source)
            }
        }
    }

    /// Get a developer-friendly error message with full chain
    pub fn developer_message(&self) -> String {
        let mut msg = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            msg.push_str(&format!("\n  caused by: {}", err));
            cause = err.source();
        }
        msg
    }
}

/// Type alias for Results using StagehandError
pub type Result<T> = std::result::Result<T, StagehandError>;

impl From<std::io::Error> for StagehandError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, message) = match err.kind() {
            ErrorKind::NotFound => (ErrorCode::STORAGE_NOT_FOUND, "File or directory not found"),
            ErrorKind::PermissionDenied => {
                (ErrorCode::STORAGE_PERMISSION_DENIED, "Permission denied")
            }
            ErrorKind::AlreadyExists => (ErrorCode::STORAGE_ALREADY_EXISTS, "Already exists"),
            _ => (ErrorCode::STORAGE_IO_ERROR, "IO operation failed"),
        };

        StagehandError::storage_with_code(code, message, None).with_source(err)
    }
}

impl From<serde_yaml::Error> for StagehandError {
    fn from(err: serde_yaml::Error) -> Self {
        StagehandError::config_with_code(ErrorCode::CONFIG_INVALID_YAML, "Invalid manifest YAML")
            .with_source(err)
    }
}

impl From<serde_json::Error> for StagehandError {
    fn from(err: serde_json::Error) -> Self {
        StagehandError::config_with_code(ErrorCode::CONFIG_INVALID_JSON, "Invalid manifest JSON")
            .with_source(err)
    }
}
