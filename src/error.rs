//! Error types for netdeploy
//!
//! Library errors use `thiserror`; the binary converts to `anyhow` at
//! the CLI boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for netdeploy operations
pub type DeployResult<T> = Result<T, DeployError>;

/// Main error type for netdeploy operations
#[derive(Error, Debug)]
pub enum DeployError {
    /// Working directory is not an Angular project root
    #[error("angular.json not found - run netdeploy from an Angular project root")]
    NotAProject,

    /// External build tool failed or is missing
    #[error("ng build failed: {message}")]
    Build {
        message: String,
        /// Raw build-tool output, shown verbatim on failure
        diagnostics: String,
    },

    /// Build output directory missing
    #[error("build output not found: {0}")]
    BuildOutputMissing(String),

    /// Archive creation failed
    #[error("failed to create archive '{name}'")]
    Packaging {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote server did not answer the reachability probe
    #[error("cannot reach server {server}: {reason}")]
    Unreachable { server: String, reason: String },

    /// Share mount was refused (reachability was fine)
    #[error("failed to connect to network share: {0}")]
    Authentication(String),

    /// Backup archival failed (callers treat this as a warning)
    #[error("backup failed: {0}")]
    Backup(String),

    /// Extraction into the remote target failed - the target may be
    /// in a partially written state
    #[error("failed to extract archive into {target}")]
    Extraction {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// User declined the confirmation prompt or interrupted the run
    #[error("deployment cancelled")]
    Cancelled,

    /// Deployment path token could not be split into site and app
    #[error("invalid deployment path '{0}' - expected SITE_NAME/APP_NAME")]
    InvalidTarget(String),

    /// Unknown key passed to `config set`
    #[error("invalid config key '{key}' - valid keys are: {valid_keys}")]
    InvalidConfigKey { key: String, valid_keys: String },

    /// Config file exists but could not be parsed
    #[error("invalid config file {file}: {message}")]
    Config { file: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    /// Extra diagnostic detail rendered only in verbose mode.
    pub fn verbose_detail(&self) -> Option<String> {
        match self {
            DeployError::Build { diagnostics, .. } if !diagnostics.is_empty() => {
                Some(diagnostics.clone())
            }
            DeployError::Packaging { source, .. } => Some(source.to_string()),
            DeployError::Extraction { source, .. } => Some(source.to_string()),
            _ => None,
        }
    }
}
