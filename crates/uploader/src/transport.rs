//! Remote transport trait.
//!
//! `RemoteTransport` is implemented by the SSH crate on top of an SFTP
//! session. Using a trait keeps the upload logic decoupled from the
//! wire and testable with an in-memory remote.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::types::{CommandOutput, RemoteEntryKind};

/// Boxed future returned by transport operations.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Abstract connection to a remote host.
pub trait RemoteTransport: Send + Sync {
    /// Returns the kind of `path`, or `None` if it does not exist.
    fn stat<'a>(&'a self, path: &'a str) -> TransportFuture<'a, Option<RemoteEntryKind>>;

    /// Creates a single directory. The parent must already exist.
    fn create_dir<'a>(&'a self, path: &'a str) -> TransportFuture<'a, ()>;

    /// Copies a local file to `remote`, overwriting it. Returns bytes written.
    fn upload_file<'a>(&'a self, local: &'a Path, remote: &'a str) -> TransportFuture<'a, u64>;

    /// Writes an in-memory buffer to `remote`, overwriting it.
    fn write_file<'a>(&'a self, remote: &'a str, contents: &'a [u8]) -> TransportFuture<'a, ()>;

    /// Runs a command and collects its combined output and exit status.
    fn exec<'a>(&'a self, command: &'a str) -> TransportFuture<'a, CommandOutput>;

    /// Runs a command, forwarding each output line as it is produced.
    ///
    /// Returns the exit status once the command finishes.
    fn exec_streaming<'a>(
        &'a self,
        command: &'a str,
        lines: mpsc::Sender<String>,
    ) -> TransportFuture<'a, Option<u32>>;

    /// Ensures `path` exists as a directory.
    ///
    /// Returns `true` if this call created it. Safe to call repeatedly: an
    /// existing directory, or a create that lost a race with another
    /// creator, is not an error. A non-directory at `path` is.
    fn ensure_dir<'a>(&'a self, path: &'a str) -> TransportFuture<'a, bool> {
        Box::pin(async move {
            match self.stat(path).await? {
                Some(RemoteEntryKind::Directory) => Ok(false),
                Some(_) => Err(TransportError::NotADirectory(path.to_string())),
                None => match self.create_dir(path).await {
                    Ok(()) => Ok(true),
                    Err(e) => match self.stat(path).await {
                        Ok(Some(RemoteEntryKind::Directory)) => Ok(false),
                        _ => Err(e),
                    },
                },
            }
        })
    }
}
