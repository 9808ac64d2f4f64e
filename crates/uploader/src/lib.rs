//! Selective directory-tree upload.
//!
//! This crate implements the **business logic** for copying a local
//! project tree onto a remote host. It has no SSH dependency; callers
//! provide a [`RemoteTransport`] implementation that bridges to the
//! actual session.
//!
//! # Pipeline
//!
//! 1. **Scan**: walk the local root, pruning excluded directories
//! 2. **Filter**: drop any path with an excluded segment
//! 3. **Materialize**: ensure each file's remote ancestors exist
//! 4. **Copy**: overwrite the remote file with the local bytes
//!
//! A failure in steps 3–4 skips that file only; the run continues and
//! the failure is reported in the [`UploadReport`].

pub mod error;
pub mod exclusion;
pub mod paths;
pub mod scanner;
pub mod transport;
pub mod types;
pub mod upload;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

// Re-export primary types for convenience.
pub use error::{TransportError, UploadError};
pub use exclusion::ExclusionSet;
pub use paths::{remote_ancestors, remote_join, remote_parent, validate_relative_path};
pub use scanner::scan_files_for_upload;
pub use transport::{RemoteTransport, TransportFuture};
pub use types::{
    CommandOutput, FileEntry, RemoteEntryKind, UploadEvent, UploadFailure, UploadReport,
};
pub use upload::{DEFAULT_PROGRESS_INTERVAL, RemoteDirectoryCache, Uploader};
