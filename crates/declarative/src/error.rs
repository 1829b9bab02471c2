//! Error types for the reconciliation engine.
//!
//! Only [`Error::Config`] is fatal to a run. Every other variant is
//! recovered locally: collection failures degrade a domain to an empty
//! mapping, execution failures become failed [`ApplyResult`]s and record
//! problems fall back to an empty record.
//!
//! [`ApplyResult`]: crate::types::ApplyResult

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the engine and its file-backed stores.
#[derive(Debug, Error)]
pub enum Error {
    /// The desired configuration could not be read, parsed or validated
    #[error("failed to load configuration {path}: {message}")]
    Config {
        /// Path of the configuration document
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// An observed-state collector failed for one domain
    #[error("failed to collect {domain} state: {message}")]
    Collection {
        /// Resource kind that could not be observed
        domain: &'static str,
        /// Underlying failure
        message: String,
    },

    /// The persisted record could not be written
    #[error("state record {path}: {message}")]
    Record {
        /// Path of the record file
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// An external command exited unsuccessfully
    #[error("command `{command}` failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        /// Rendered command line
        command: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Trimmed standard error
        stderr: String,
    },

    /// A value cannot be coerced to the requested wire type
    #[error("cannot write {value} as {value_type}: {reason}")]
    InvalidValue {
        /// Display form of the offending value
        value: String,
        /// Requested type tag
        value_type: String,
        /// Why coercion failed
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a configuration error for `path`.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_config_errors_are_fatal() {
        assert!(Error::config("/tmp/config.toml", "bad").is_fatal());
        assert!(
            !Error::Collection {
                domain: "brew",
                message: "brew not found".into(),
            }
            .is_fatal()
        );
        assert!(
            !Error::CommandFailed {
                command: "brew install wget".into(),
                code: Some(1),
                stderr: "No available formula".into(),
            }
            .is_fatal()
        );
    }

    #[test]
    fn command_failed_display_includes_stderr() {
        let err = Error::CommandFailed {
            command: "defaults write com.apple.dock autohide -bool true".into(),
            code: Some(1),
            stderr: "Could not write domain".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("defaults write"));
        assert!(msg.contains("Could not write domain"));
    }
}
