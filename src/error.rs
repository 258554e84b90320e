//! Error types shared by the xref map generation pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving versions, loading xref maps or driving the
/// external collaborators (git, docfx, HTTP).
#[derive(Debug, Error)]
pub enum XrefError {
    /// The xref map text does not match the expected document schema, even
    /// after the digit-colon pre-pass.
    #[error("Failed to parse xref map: {0}")]
    Parse(String),

    /// A required item (usually the latest stable version) could not be found.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external command (git, docfx) could not be started or exited with a
    /// non-zero status.
    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A tag listed by the version control provider carries an unreadable date.
    #[error("Invalid tag '{tag}': {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl XrefError {
    /// Wrap an I/O error with the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        XrefError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        XrefError::Command {
            command: command.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, XrefError>;
