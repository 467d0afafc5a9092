//! Error types for chart rendering and registry credentials

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    // ============ Values ============
    #[error("Invalid --set format: '{arg}'. Expected key=value")]
    InvalidSet { arg: String },

    #[error("Failed to read values file {path}: {message}")]
    ValuesFile { path: PathBuf, message: String },

    // ============ Rendering ============
    #[error("Invalid chart reference '{reference}': {reason}")]
    InvalidChartRef { reference: String, reason: String },

    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("helm template failed ({status}): {stderr}")]
    RenderFailed { status: String, stderr: String },

    #[error("Rendered manifest is not valid UTF-8")]
    NotUtf8,

    // ============ Credentials ============
    #[error("Unsupported container engine '{0}' (expected docker or podman)")]
    UnsupportedEngine(String),

    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Failed to parse auth file {path}: {source}")]
    AuthFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid credentials for registry {registry}: {message}")]
    InvalidAuth { registry: String, message: String },

    // ============ Wrapped ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChartError>;
