//! Core data models for netdeploy
//!
//! Defines the fundamental data structures used throughout netdeploy:
//! - `DeploymentTarget`: the site/app pair identifying the destination
//! - `ArtifactPackage`: the zipped build output
//! - `BackupRecord`: the pre-overwrite snapshot of the remote target

use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::error::{DeployError, DeployResult};

/// Placeholder for the site name in the target directory pattern
pub const SITE_PLACEHOLDER: &str = "{SITE_NAME}";
/// Placeholder for the app name in the target directory pattern
pub const APP_PLACEHOLDER: &str = "{APP_NAME}";

/// Timestamp format used in archive and backup names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Logical deployment destination: which site and which app under it.
///
/// Both tokens are non-empty and free of path separators. Constructed
/// once per run and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub site_name: String,
    pub app_name: String,
}

impl DeploymentTarget {
    /// Create a target from separate site and app tokens.
    pub fn new(site_name: &str, app_name: &str) -> DeployResult<Self> {
        if site_name.is_empty() || has_separator(site_name) {
            return Err(DeployError::InvalidTarget(site_name.to_string()));
        }
        if app_name.is_empty() || has_separator(app_name) {
            return Err(DeployError::InvalidTarget(app_name.to_string()));
        }
        Ok(Self {
            site_name: site_name.to_string(),
            app_name: app_name.to_string(),
        })
    }

    /// Parse a combined `SITE\APP` or `SITE/APP` token.
    ///
    /// Either separator is accepted; both halves must be present.
    pub fn from_token(token: &str) -> DeployResult<Self> {
        let normalized = token.replace('/', "\\");
        let parts: Vec<&str> = normalized.split('\\').collect();
        if parts.len() != 2 {
            return Err(DeployError::InvalidTarget(token.to_string()));
        }
        Self::new(parts[0], parts[1])
    }

    /// Resolve the target directory pattern for this destination.
    ///
    /// Substitutes `{SITE_NAME}` and `{APP_NAME}` placeholders.
    pub fn resolve_pattern(&self, pattern: &str) -> String {
        pattern
            .replace(SITE_PLACEHOLDER, &self.site_name)
            .replace(APP_PLACEHOLDER, &self.app_name)
    }

    /// Archive file name for a packaging run started at `at`.
    pub fn archive_name(&self, at: DateTime<Local>) -> String {
        format!(
            "{}_{}_build_{}.zip",
            self.site_name,
            self.app_name,
            at.format(TIMESTAMP_FORMAT)
        )
    }

    /// Backup archive file name for a backup started at `at`.
    pub fn backup_name(&self, at: DateTime<Local>) -> String {
        format!("{}_bkp_{}.zip", self.app_name, at.format(TIMESTAMP_FORMAT))
    }
}

impl std::fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\\{}", self.site_name, self.app_name)
    }
}

fn has_separator(token: &str) -> bool {
    token.contains('/') || token.contains('\\')
}

/// The zipped build output. Created once per run, never mutated, and
/// left on disk for the operator (the manual-fallback path depends on
/// it surviving a failed run).
#[derive(Debug, Clone)]
pub struct ArtifactPackage {
    pub archive_path: PathBuf,
    pub created_at: DateTime<Local>,
    /// Number of files stored in the archive
    pub entry_count: usize,
}

impl ArtifactPackage {
    /// File name component of the archive path.
    pub fn file_name(&self) -> String {
        self.archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.archive_path.display().to_string())
    }
}

/// Snapshot of the remote target taken before it was cleared.
///
/// Exists only when the target directory had content and backup was
/// not disabled.
#[derive(Debug, Clone)]
pub struct BackupRecord {
    pub archive_path: PathBuf,
    /// When the snapshot was taken (strictly before the clear)
    pub snapshot_time: DateTime<Local>,
    pub entry_count: usize,
}
