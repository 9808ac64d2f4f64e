//! Sequential tree replication onto a remote root.
//!
//! Each file is fully processed (ancestor directories ensured, then
//! bytes copied) before the next one starts. Per-file failures are
//! recorded in the report and never abort the run.

use std::collections::HashSet;
use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::UploadError;
use crate::exclusion::ExclusionSet;
use crate::paths::{remote_ancestors, remote_join, remote_parent, validate_relative_path};
use crate::scanner::scan_files_for_upload;
use crate::transport::RemoteTransport;
use crate::types::{FileEntry, UploadEvent, UploadFailure, UploadReport};

/// Default number of files between progress events.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 20;

/// Remote directories already confirmed to exist during one run.
#[derive(Debug, Default)]
pub struct RemoteDirectoryCache {
    known: HashSet<String>,
}

impl RemoteDirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, dir: &str) -> bool {
        self.known.contains(dir)
    }

    pub fn insert(&mut self, dir: impl Into<String>) {
        self.known.insert(dir.into());
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

/// Replicates discovered files onto a remote root.
pub struct Uploader<'a> {
    transport: &'a dyn RemoteTransport,
    remote_root: String,
    exclusions: ExclusionSet,
    progress_interval: usize,
}

impl<'a> Uploader<'a> {
    /// Creates an uploader targeting `remote_root` with no exclusions.
    pub fn new(transport: &'a dyn RemoteTransport, remote_root: impl Into<String>) -> Self {
        Self {
            transport,
            remote_root: remote_root.into(),
            exclusions: ExclusionSet::new(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Sets how many files pass between progress events. Zero is treated as one.
    pub fn with_progress_interval(mut self, every: usize) -> Self {
        self.progress_interval = every.max(1);
        self
    }

    pub fn remote_root(&self) -> &str {
        &self.remote_root
    }

    /// Scans `local_root` and uploads everything that survives the exclusions.
    ///
    /// Fails only if the local root cannot be scanned.
    pub async fn upload_dir(
        &self,
        local_root: &Path,
        events_tx: &mpsc::Sender<UploadEvent>,
    ) -> Result<UploadReport, UploadError> {
        let entries = scan_files_for_upload(local_root, &self.exclusions)?;
        Ok(self.upload(&entries, events_tx).await)
    }

    /// Uploads `entries` in order.
    pub async fn upload(
        &self,
        entries: &[FileEntry],
        events_tx: &mpsc::Sender<UploadEvent>,
    ) -> UploadReport {
        let mut cache = RemoteDirectoryCache::new();
        self.upload_with_cache(entries, &mut cache, events_tx).await
    }

    /// Uploads `entries` in order, skipping checks for directories
    /// already in `cache` and adding every directory it confirms.
    pub async fn upload_with_cache(
        &self,
        entries: &[FileEntry],
        cache: &mut RemoteDirectoryCache,
        events_tx: &mpsc::Sender<UploadEvent>,
    ) -> UploadReport {
        let total = entries.len();
        let total_bytes: u64 = entries.iter().map(|e| e.size).sum();
        let mut report = UploadReport {
            total_files: total,
            ..Default::default()
        };

        info!(
            files = total,
            total_bytes,
            remote_root = %self.remote_root,
            "starting upload"
        );
        let _ = events_tx
            .send(UploadEvent::Started {
                total_files: total,
                total_bytes,
            })
            .await;

        for (i, entry) in entries.iter().enumerate() {
            let done = i + 1;

            match self.upload_one(entry, cache, &mut report).await {
                Ok(bytes) => {
                    report.uploaded_files += 1;
                    report.uploaded_bytes += bytes;
                    debug!(path = %entry.relative_path, bytes, "uploaded");
                }
                Err(e) => {
                    warn!(path = %entry.relative_path, error = %e, "upload failed, skipping");
                    let error = e.to_string();
                    let _ = events_tx
                        .send(UploadEvent::Failed {
                            relative_path: entry.relative_path.clone(),
                            error: error.clone(),
                        })
                        .await;
                    report.failures.push(UploadFailure {
                        relative_path: entry.relative_path.clone(),
                        error,
                    });
                }
            }

            if done % self.progress_interval == 0 || done == total {
                let _ = events_tx
                    .send(UploadEvent::Progress {
                        done,
                        total,
                        relative_path: entry.relative_path.clone(),
                    })
                    .await;
            }
        }

        info!(
            uploaded = report.uploaded_files,
            failed = report.failed_files(),
            dirs_created = report.created_dirs.len(),
            "upload finished"
        );
        let _ = events_tx
            .send(UploadEvent::Finished {
                uploaded: report.uploaded_files,
                failed: report.failed_files(),
            })
            .await;

        report
    }

    async fn upload_one(
        &self,
        entry: &FileEntry,
        cache: &mut RemoteDirectoryCache,
        report: &mut UploadReport,
    ) -> Result<u64, UploadError> {
        validate_relative_path(&entry.relative_path)?;

        let remote_path = remote_join(&self.remote_root, &entry.relative_path);
        if let Some(parent) = remote_parent(&remote_path) {
            self.ensure_remote_dir(parent, cache, report).await?;
        }

        let bytes = self
            .transport
            .upload_file(&entry.local_path, &remote_path)
            .await?;
        Ok(bytes)
    }

    /// Ensures every ancestor of `dir` exists, outermost first.
    async fn ensure_remote_dir(
        &self,
        dir: &str,
        cache: &mut RemoteDirectoryCache,
        report: &mut UploadReport,
    ) -> Result<(), UploadError> {
        for ancestor in remote_ancestors(dir) {
            if cache.contains(&ancestor) {
                continue;
            }

            if self.transport.ensure_dir(&ancestor).await? {
                debug!(dir = %ancestor, "created remote directory");
                report.created_dirs.push(ancestor.clone());
            }
            cache.insert(ancestor);
        }

        Ok(())
    }
}
