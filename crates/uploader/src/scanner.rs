//! File scanning for upload.
//!
//! Recursively walks a directory and produces a list of file entries
//! with relative paths normalized to forward slashes. Excluded
//! directories are pruned during the walk, and every surviving path is
//! checked segment by segment afterwards.

use std::path::Path;

use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::UploadError;
use crate::exclusion::ExclusionSet;
use crate::types::FileEntry;

/// Scans a directory recursively and returns the files to upload.
///
/// Entries come back in walk order (sorted by file name within each
/// directory), so the result is stable for a given filesystem state.
/// Unreadable subdirectories are logged and skipped.
pub fn scan_files_for_upload(
    root_path: &Path,
    exclusions: &ExclusionSet,
) -> Result<Vec<FileEntry>, UploadError> {
    let metadata = match std::fs::metadata(root_path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(UploadError::RootNotFound(root_path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_dir() {
        return Err(UploadError::RootNotDirectory(root_path.to_path_buf()));
    }

    let walker = WalkDir::new(root_path)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !exclusions.contains(&entry.file_name().to_string_lossy())
        });

    let mut files = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }

        let rel_path = entry
            .path()
            .strip_prefix(root_path)
            .map_err(std::io::Error::other)?;
        let rel_str = normalize_relative(rel_path);

        if exclusions.is_excluded(&rel_str) {
            trace!(path = %rel_str, "excluded");
            continue;
        }

        // walkdir does not follow links here, so a symlink's own metadata
        // would report the link length rather than the target's.
        let metadata = if entry.path_is_symlink() {
            std::fs::metadata(entry.path())
        } else {
            entry.metadata().map_err(std::io::Error::from)
        };
        let size = match metadata {
            Ok(m) => m.len(),
            Err(e) => {
                warn!(path = %rel_str, error = %e, "unable to read metadata");
                0
            }
        };

        files.push(FileEntry {
            local_path: entry.path().to_path_buf(),
            relative_path: rel_str,
            size,
        });
    }

    debug!(
        root = %root_path.display(),
        files = files.len(),
        "scan complete"
    );

    Ok(files)
}

/// Joins path components with `/`, independent of the host separator.
fn normalize_relative(rel_path: &Path) -> String {
    rel_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
