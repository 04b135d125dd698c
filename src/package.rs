//! Build output packaging
//!
//! Locates the build output folder and compresses it into a single
//! timestamped zip archive in the working directory. The archive is
//! staged to a temp file and persisted to its final name so a failed
//! write never leaves a half-written archive behind.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use ignore::WalkBuilder;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{DeployError, DeployResult};
use crate::models::{ArtifactPackage, DeploymentTarget};

/// Conventional build output folders, probed in order.
pub const BUILD_FOLDER_CANDIDATES: [&str; 2] = ["www", "dist"];

/// Locate the build output folder under `project_root`.
///
/// An explicit override must exist; otherwise the first candidate that
/// exists wins.
pub fn find_build_folder(
    project_root: &Path,
    override_folder: Option<&Path>,
) -> DeployResult<PathBuf> {
    if let Some(folder) = override_folder {
        let path = project_root.join(folder);
        if path.is_dir() {
            return Ok(path);
        }
        return Err(DeployError::BuildOutputMissing(format!(
            "specified build folder '{}' not found",
            folder.display()
        )));
    }

    for candidate in BUILD_FOLDER_CANDIDATES {
        let path = project_root.join(candidate);
        if path.is_dir() {
            return Ok(path);
        }
    }

    Err(DeployError::BuildOutputMissing(format!(
        "neither '{}' nor '{}' folder found after build",
        BUILD_FOLDER_CANDIDATES[0], BUILD_FOLDER_CANDIDATES[1]
    )))
}

/// Packages a build folder into a timestamped archive.
pub struct Packager {
    /// Directory the archive is written into (the working directory in
    /// production; a temp dir in tests).
    out_dir: PathBuf,
}

impl Packager {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Compress everything under `build_folder` into
    /// `{site}_{app}_build_{timestamp}.zip`.
    ///
    /// Entry paths are relative to `build_folder`. A folder tree with
    /// no files produces an archive with zero entries.
    pub fn package(
        &self,
        build_folder: &Path,
        target: &DeploymentTarget,
    ) -> DeployResult<ArtifactPackage> {
        let created_at = Local::now();
        let name = target.archive_name(created_at);

        let entry_count = archive_dir_contents(build_folder, &self.out_dir, &name)
            .map_err(|source| DeployError::Packaging {
                name: name.clone(),
                source,
            })?;

        Ok(ArtifactPackage {
            archive_path: self.out_dir.join(name),
            created_at,
            entry_count,
        })
    }
}

/// Zip the recursive file contents of `root` into `dest_dir/file_name`.
///
/// Shared by packaging and backup. Returns the stored entry count.
pub(crate) fn archive_dir_contents(
    root: &Path,
    dest_dir: &Path,
    file_name: &str,
) -> io::Result<usize> {
    let staging = NamedTempFile::new_in(dest_dir)?;
    let mut writer = ZipWriter::new(staging);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entry_count = 0usize;
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::other(e.to_string()))?;
        // Zip entry names always use forward slashes.
        let entry_name = rel.to_string_lossy().replace('\\', "/");

        writer
            .start_file(entry_name, options)
            .map_err(io::Error::other)?;
        let mut input = File::open(entry.path())?;
        io::copy(&mut input, &mut writer)?;
        entry_count += 1;
    }

    let mut staging = writer.finish().map_err(io::Error::other)?;
    staging.flush()?;
    staging
        .persist(dest_dir.join(file_name))
        .map_err(|e| e.error)?;

    Ok(entry_count)
}
