//! netdeploy - build and deploy utility for IIS network shares
//!
//! netdeploy packages a local web build into a timestamped zip archive
//! and ships it to a remote Windows server over an SMB share: validate
//! the project, build, package, connect (anonymous UNC access with an
//! authenticated drive-mapping fallback), back up the current remote
//! contents, then replace them. Any failure after packaging degrades
//! to manual deployment instructions instead of leaving the operator
//! guessing.

pub mod backup;
pub mod config;
pub mod deploy;
pub mod error;
pub mod models;
pub mod package;
pub mod pipeline;
pub mod process;
pub mod share;
pub mod ui;

// Re-exports for convenience
pub use config::{ConfigOverrides, DeploymentConfig};
pub use error::{DeployError, DeployResult};
pub use models::{ArtifactPackage, BackupRecord, DeploymentTarget};
pub use pipeline::{DeployOptions, DeployPipeline, Outcome, PipelineEvent, Stage};
pub use process::{CommandRunner, SystemRunner};
pub use share::{Connector, NetworkConnector, ShareAccess, SystemShareFs};
pub use ui::{Prompt, TerminalPrompt};
