//! Core error and warning types
//!
//! Errors abort the whole translation. Everything that only affects a single
//! document, resource or field is reported as a [`TranslateWarning`] instead and
//! processing continues with the next sibling.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(
        "port conflict: port {port} is already used by service '{existing}', \
         cannot be used by service '{service}'"
    )]
    PortConflict {
        port: u16,
        existing: String,
        service: String,
    },

    #[error("failed to emit '{unit}' into {path}: {source}")]
    Emit {
        unit: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{failed} of {total} unit(s) could not be written")]
    EmitIncomplete { failed: usize, total: usize },

    #[error("Failed to serialize compose file: {0}")]
    YamlSerialize(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// What went wrong in a non-fatal way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A YAML document could not be turned into a resource record
    Parse,
    /// A Deployment/StatefulSet (or Service) is missing required structure
    InvalidResource,
    /// A later resource replaced an earlier one with the same name
    Duplicate,
    /// A ConfigMap, Secret or key referenced by a container does not exist
    MissingReference,
    /// A Secret value is not valid base64 (or not UTF-8 once decoded)
    Decode,
    /// A `fieldRef` path could not be resolved
    FieldRef,
    /// Something the target runtime cannot express
    Unsupported,
}

impl WarningKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::InvalidResource => "invalid-resource",
            Self::Duplicate => "duplicate",
            Self::MissingReference => "missing-reference",
            Self::Decode => "decode",
            Self::FieldRef => "field-ref",
            Self::Unsupported => "unsupported",
        }
    }
}

/// A recoverable problem found while translating a manifest set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateWarning {
    pub kind: WarningKind,
    /// `Kind/name` of the resource, or `document N` when no name is known
    pub scope: String,
    pub message: String,
}

impl TranslateWarning {
    pub fn new(kind: WarningKind, scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            scope: scope.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for TranslateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.label(), self.scope, self.message)
    }
}

/// Collects warnings and mirrors each one to the log as it arrives
#[derive(Debug, Default)]
pub struct Warnings(Vec<TranslateWarning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        kind: WarningKind,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) {
        let warning = TranslateWarning::new(kind, scope, message);
        tracing::warn!(kind = warning.kind.label(), scope = %warning.scope, "{}", warning.message);
        self.0.push(warning);
    }

    pub fn extend(&mut self, other: Warnings) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranslateWarning> {
        self.0.iter()
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.0.iter().filter(|w| w.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<TranslateWarning> {
        self.0
    }
}
