//! Pre-overwrite backup of the remote target
//!
//! Runs strictly before the target directory is cleared. Backup
//! failures are surfaced as warnings by the pipeline, never as fatal
//! errors - an unavailable backup must not block a deployment.

use std::fs;
use std::path::Path;

use chrono::Local;

use crate::error::{DeployError, DeployResult};
use crate::models::{BackupRecord, DeploymentTarget};
use crate::package::archive_dir_contents;

/// Archive the current contents of `target_path` into `backup_dir`.
///
/// Returns `None` when the target does not exist or is empty - there
/// is nothing meaningful to preserve, and no I/O happens beyond the
/// existence and listing checks.
pub fn backup(
    target_path: &Path,
    backup_dir: &Path,
    target: &DeploymentTarget,
) -> DeployResult<Option<BackupRecord>> {
    if !target_path.exists() {
        return Ok(None);
    }

    let is_empty = fs::read_dir(target_path)
        .map_err(|e| DeployError::Backup(e.to_string()))?
        .next()
        .is_none();
    if is_empty {
        return Ok(None);
    }

    let snapshot_time = Local::now();
    let name = target.backup_name(snapshot_time);
    fs::create_dir_all(backup_dir).map_err(|e| DeployError::Backup(e.to_string()))?;

    let entry_count = archive_dir_contents(target_path, backup_dir, &name)
        .map_err(|e| DeployError::Backup(e.to_string()))?;

    Ok(Some(BackupRecord {
        archive_path: backup_dir.join(name),
        snapshot_time,
        entry_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn target() -> DeploymentTarget {
        DeploymentTarget::new("akbl", "mobile").unwrap()
    }

    #[test]
    fn absent_target_yields_no_record() {
        let dir = tempdir().unwrap();
        let record = backup(
            &dir.path().join("missing"),
            &dir.path().join("backups"),
            &target(),
        )
        .unwrap();

        assert!(record.is_none());
        // No I/O beyond the existence check: backup dir untouched.
        assert!(!dir.path().join("backups").exists());
    }

    #[test]
    fn empty_target_yields_no_record() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("live");
        fs::create_dir(&live).unwrap();

        let record = backup(&live, &dir.path().join("backups"), &target()).unwrap();

        assert!(record.is_none());
        assert!(!dir.path().join("backups").exists());
    }

    #[test]
    fn backup_snapshots_target_contents() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("live");
        fs::create_dir_all(live.join("static")).unwrap();
        fs::write(live.join("index.html"), "old site").unwrap();
        fs::write(live.join("static/main.css"), "body{}").unwrap();

        let backups = dir.path().join("backups");
        let record = backup(&live, &backups, &target()).unwrap().unwrap();

        assert_eq!(record.entry_count, 2);
        assert!(record
            .archive_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("mobile_bkp_"));

        let archive = zip::ZipArchive::new(File::open(&record.archive_path).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["index.html", "static/main.css"]);
    }

    #[test]
    fn backup_creates_missing_backup_dir() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("live");
        fs::create_dir(&live).unwrap();
        fs::write(live.join("f.txt"), "x").unwrap();

        let backups = dir.path().join("nested/backups");
        let record = backup(&live, &backups, &target()).unwrap();

        assert!(record.is_some());
        assert!(backups.is_dir());
    }

    #[test]
    fn backup_failure_is_a_backup_error() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("live");
        fs::create_dir(&live).unwrap();
        fs::write(live.join("f.txt"), "x").unwrap();

        // A file where the backup dir should be makes create_dir_all fail.
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, "not a dir").unwrap();

        let result = backup(&live, &blocked, &target());
        assert!(matches!(result, Err(DeployError::Backup(_))));
    }
}
