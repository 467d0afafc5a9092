//! CLI error types with exit code handling
//!
//! Every command returns [`CliError`], which maps to a process exit code and
//! is rendered through miette.

use kubedown_chart::ChartError;
use kubedown_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// The manifests cannot be translated as a whole
    #[error("Translation failed: {message}")]
    #[diagnostic(code(kubedown::cli::translate))]
    Translate {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Chart rendering or registry credentials failed
    #[error("Render failed: {message}")]
    #[diagnostic(code(kubedown::cli::render))]
    Render {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Some units were not written
    #[error("{message}")]
    #[diagnostic(code(kubedown::cli::emit))]
    Emit { message: String },

    /// Invalid arguments or settings
    #[error("{message}")]
    #[diagnostic(code(kubedown::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(kubedown::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(kubedown::cli::error))]
    Other { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Translate { .. } => exit_codes::TRANSLATE_ERROR,
            CliError::Render { .. } => exit_codes::RENDER_ERROR,
            CliError::Emit { .. } => exit_codes::EMIT_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: None,
        }
    }

    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn render_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::PortConflict { .. } => CliError::Translate {
                message: err.to_string(),
                help: Some(
                    "Services share the host network; \
                     give them distinct ports or drop --host-network"
                        .to_string(),
                ),
            },
            CoreError::Emit { .. } | CoreError::EmitIncomplete { .. } => CliError::Emit {
                message: err.to_string(),
            },
            CoreError::Io(e) => CliError::from(e),
            CoreError::YamlSerialize(_) => CliError::Other {
                message: err.to_string(),
            },
        }
    }
}

impl From<ChartError> for CliError {
    fn from(err: ChartError) -> Self {
        match err {
            ChartError::InvalidSet { .. } | ChartError::UnsupportedEngine(_) => {
                CliError::usage(err.to_string())
            }
            ChartError::Spawn { .. } => CliError::render_with_help(
                err.to_string(),
                "Install helm or point --helm / KUBEDOWN_HELM at the binary",
            ),
            ChartError::Io(e) => CliError::from(e),
            _ => CliError::Render {
                message: err.to_string(),
                help: None,
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
