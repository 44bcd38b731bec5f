//! Error types for cluster sanitization.
//!
//! Only [`ConfigError`] and run cancellation abort a run. Fetch and
//! sanitizer failures degrade into the report's error list.

use crate::cache::Kind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Run cancelled")]
    Cancelled,
}

/// Cluster API failures. Never retried here.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to create Kubernetes client: {0}")]
    Client(String),

    #[error("Failed to list {kind}: {source}")]
    List {
        kind: Kind,
        #[source]
        source: kube::Error,
    },

    #[error("Failed to get {kind} {fqn}: {source}")]
    Get {
        kind: Kind,
        fqn: String,
        #[source]
        source: kube::Error,
    },

    #[error("Fetch cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid exclude pattern '{pattern}' for {section}: {reason}")]
    InvalidPattern {
        section: String,
        pattern: String,
        reason: String,
    },

    #[error("Unknown sanitizer: {0}")]
    UnknownSanitizer(String),
}

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("{0} sanitizer cancelled")]
    Cancelled(&'static str),

    #[error("{sanitizer} sanitizer failed: {reason}")]
    Failed {
        sanitizer: &'static str,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}
