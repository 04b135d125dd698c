//! Remote target replacement
//!
//! Clears the remote target directory and extracts the packaged
//! archive into it. Clearing is tolerant (per-item failures become
//! warnings); extraction is not (a half-extracted target is a broken,
//! user-visible state).

use std::fs::{self, File};
use std::io;
use std::path::Path;

use zip::ZipArchive;

use crate::error::{DeployError, DeployResult};

/// Remove every direct child of `target_path`.
///
/// A missing target is created empty. Per-item delete failures are
/// collected as warnings rather than raised: the original tool ships
/// this way, and the subsequent extraction overwrites matching paths
/// anyway. The documented tradeoff is that an item that could not be
/// deleted AND is absent from the archive survives as a stale file -
/// the warning list makes that visible to the operator.
pub fn clear_target(target_path: &Path) -> DeployResult<Vec<String>> {
    if !target_path.exists() {
        fs::create_dir_all(target_path)?;
        return Ok(Vec::new());
    }

    let mut warnings = Vec::new();
    let entries = match fs::read_dir(target_path) {
        Ok(entries) => entries,
        Err(e) => {
            warnings.push(format!(
                "could not list {}: {e}",
                target_path.display()
            ));
            return Ok(warnings);
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warnings.push(format!("could not read directory entry: {e}"));
                continue;
            }
        };
        let path = entry.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        if let Err(e) = removed {
            warnings.push(format!("could not remove {}: {e}", path.display()));
        }
    }

    Ok(warnings)
}

/// Extract every archive entry into `target_path`, recreating the
/// archive's directory structure. Returns the extracted entry count.
pub fn deploy_archive(archive_path: &Path, target_path: &Path) -> DeployResult<usize> {
    let extraction_error = |source: io::Error| DeployError::Extraction {
        target: target_path.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(extraction_error)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| extraction_error(io::Error::other(e)))?;
    let entry_count = archive.len();

    archive
        .extract(target_path)
        .map_err(|e| extraction_error(io::Error::other(e)))?;

    Ok(entry_count)
}
