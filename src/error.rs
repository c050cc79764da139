//! Unified error types for workspace discovery with a fail-open policy.
//!
//! Errors local to one directory or one root-path task never abort a
//! discovery run: they are logged and the directory degrades to an
//! unrecognized classification. Errors about the caller's own input (a
//! target path that does not exist, a symlink loop) are returned.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for workspace discovery.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// I/O errors while reading directories, marker files or config.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A unit-config file (`grove.yml` and friends) could not be parsed.
    #[error("invalid unit config at {path}: {message}")]
    UnitConfig { path: PathBuf, message: String },

    /// Discovery configuration loading or resolution errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// The caller's target path cannot be resolved.
    #[error("cannot resolve {path}: {message}")]
    PathResolution { path: PathBuf, message: String },

    /// Walker or collaborator failures.
    #[error("discovery error: {message}")]
    Discovery { message: String },

    /// A root-path task observed cancellation before it started walking.
    #[error("discovery cancelled before scanning {root}")]
    Cancelled { root: PathBuf },
}

/// A specialized Result type for workspace operations.
pub type Result<T> = std::result::Result<T, WorkspaceError>;

impl WorkspaceError {
    /// Create an I/O error tied to a path.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a unit-config parse error.
    pub fn unit_config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::UnitConfig {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a path resolution error.
    pub fn path_resolution(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PathResolution {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a discovery error.
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Create a cancellation error for a root path.
    pub fn cancelled(root: impl Into<PathBuf>) -> Self {
        Self::Cancelled { root: root.into() }
    }

    /// Whether this error is local to one directory or one root-path task.
    ///
    /// Local errors are swallowed with a log line. Path resolution errors
    /// concern the caller's input and are surfaced instead.
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::PathResolution { .. })
    }
}

impl From<io::Error> for WorkspaceError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for WorkspaceError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Log the error and continue with a safe value, so that one unreadable
/// directory never takes down a whole discovery run.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}
