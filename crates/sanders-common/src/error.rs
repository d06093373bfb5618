//! Unified error types for the sanders-infra workspace.
//!
//! Every synthesis-time failure funnels into [`InfraError`]. A pass that hits
//! any of these variants aborts before a manifest is written.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum InfraError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid or missing.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required upstream value was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing value.
        kind: &'static str,
        /// Identifier of the missing value.
        id: String,
    },

    /// Two declarations claimed the same logical id.
    #[error("duplicate logical id: \"{logical_id}\"")]
    DuplicateResource {
        /// The logical id declared twice.
        logical_id: String,
    },

    /// A declaration references a logical id that was never declared.
    #[error("resource \"{from}\" references undeclared logical id \"{target}\"")]
    DanglingReference {
        /// Logical id of the referencing declaration (or output).
        from: String,
        /// The unresolved target.
        target: String,
    },

    /// The resource dependency graph contains a cycle.
    #[error("cyclic dependency detected in resource graph at \"{logical_id}\"")]
    Cycle {
        /// A logical id that participates in the cycle.
        logical_id: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML serialization or deserialization failed.
    #[error("yaml error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl InfraError {
    /// Shorthand for a [`InfraError::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, InfraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_reference_names_both_ends() {
        let err = InfraError::DanglingReference {
            from: "BatchJobQueue".into(),
            target: "Ghost".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("BatchJobQueue"), "got: {msg}");
        assert!(msg.contains("Ghost"), "got: {msg}");
    }

    #[test]
    fn json_errors_convert() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: InfraError = source.into();
        assert!(err.to_string().starts_with("serialization error"));
    }
}
