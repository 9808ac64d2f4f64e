//! Deploy error types.

use shipwright_uploader::{TransportError, UploadError};

/// Errors that abort a deployment or readiness check.
///
/// Per-file upload failures are not errors here; they are reported in
/// the [`UploadReport`](shipwright_uploader::UploadReport).
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid environment entry: {0}")]
    InvalidEnv(String),

    #[error("invalid remote directory: {0}")]
    InvalidRemoteDir(String),
}
