//! Upload and transport error types.

use std::path::PathBuf;

/// Errors produced by a [`RemoteTransport`](crate::RemoteTransport).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ssh error: {0}")]
    Ssh(String),

    #[error("sftp error: {0}")]
    Sftp(String),

    #[error("authentication rejected for user {0}")]
    Auth(String),

    #[error("session closed")]
    Closed,

    #[error("remote path exists but is not a directory: {0}")]
    NotADirectory(String),

    #[error("remote operation failed: {0}")]
    Failed(String),
}

/// Errors produced while discovering or uploading a tree.
///
/// `RootNotFound`, `RootNotDirectory` and `Io` during discovery are fatal.
/// The remaining variants are recorded per file and never abort a run.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("local root does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("local root is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
