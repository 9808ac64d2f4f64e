//! Data types shared by discovery, replication and transports.

use std::path::PathBuf;

/// A local file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute (or root-joined) local path.
    pub local_path: PathBuf,
    /// Path relative to the scanned root, `/`-separated on every platform.
    pub relative_path: String,
    /// Size in bytes at discovery time.
    pub size: u64,
}

/// Kind of an existing remote path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEntryKind {
    Directory,
    File,
    Other,
}

/// Output of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Combined stdout and stderr, trimmed.
    pub output: String,
    /// Exit status, `None` if the remote side never reported one.
    pub exit_status: Option<u32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }
}

/// Progress event emitted during an upload run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Emitted once before the first file.
    Started { total_files: usize, total_bytes: u64 },
    /// Periodic progress, not necessarily per file.
    Progress {
        done: usize,
        total: usize,
        relative_path: String,
    },
    /// A single file was skipped.
    Failed {
        relative_path: String,
        error: String,
    },
    /// Emitted once after the last file.
    Finished { uploaded: usize, failed: usize },
}

/// A file that could not be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub relative_path: String,
    pub error: String,
}

/// Aggregated outcome of an upload run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub total_files: usize,
    pub uploaded_files: usize,
    pub uploaded_bytes: u64,
    pub created_dirs: Vec<String>,
    pub failures: Vec<UploadFailure>,
}

impl UploadReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_files(&self) -> usize {
        self.failures.len()
    }
}
