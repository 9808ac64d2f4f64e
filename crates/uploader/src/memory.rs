//! In-memory remote filesystem for tests.
//!
//! Behaves like a strict remote: `create_dir` fails when the parent is
//! missing or the path exists, and uploads fail when the parent
//! directory is missing. Every call is recorded so tests can assert on
//! ordering, and individual paths can be made to fail.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::paths::remote_parent;
use crate::transport::{RemoteTransport, TransportFuture};
use crate::types::{CommandOutput, RemoteEntryKind};

/// A recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Stat(String),
    CreateDir(String),
    Upload(String),
    Write(String),
    Exec(String),
}

#[derive(Default)]
struct MemoryState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    ops: Vec<Op>,
    fail_uploads: HashSet<String>,
    fail_create_dirs: HashSet<String>,
    racing_create_dirs: HashSet<String>,
    fail_commands: HashSet<String>,
    responses: HashMap<String, CommandOutput>,
}

/// Mock transport backed by an in-memory tree.
pub struct MemoryTransport {
    state: Mutex<MemoryState>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Creates a remote containing only `/`.
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        state.dirs.insert("/".into());
        Self {
            state: Mutex::new(state),
        }
    }

    /// Pre-creates a directory and all of its ancestors.
    pub fn with_dir(self, path: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for dir in crate::paths::remote_ancestors(path) {
                state.dirs.insert(dir);
            }
        }
        self
    }

    /// Pre-creates a regular file.
    pub fn with_file(self, path: &str, contents: &[u8]) -> Self {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), contents.to_vec());
        self
    }

    /// Makes uploads to `remote` fail.
    pub fn fail_upload(&self, remote: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_uploads
            .insert(remote.to_string());
    }

    /// Makes `create_dir(path)` fail.
    pub fn fail_create_dir(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_create_dirs
            .insert(path.to_string());
    }

    /// Makes `create_dir(path)` lose a race: the directory appears, as if
    /// made by another client, and the call still returns an error.
    pub fn race_create_dir(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .racing_create_dirs
            .insert(path.to_string());
    }

    /// Makes `exec` of exactly `command` fail at the transport level.
    pub fn fail_command(&self, command: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_commands
            .insert(command.to_string());
    }

    /// Sets the canned output for exactly `command`.
    pub fn respond(&self, command: &str, output: &str, exit_status: u32) {
        self.state.lock().unwrap().responses.insert(
            command.to_string(),
            CommandOutput {
                output: output.to_string(),
                exit_status: Some(exit_status),
            },
        );
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn dirs(&self) -> Vec<String> {
        self.state.lock().unwrap().dirs.iter().cloned().collect()
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.state.lock().unwrap().files.keys().cloned().collect()
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    pub fn executed(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Exec(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }

    fn store(&self, remote: &str, data: Vec<u8>) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_uploads.contains(remote) {
            return Err(TransportError::Failed(format!("injected failure: {remote}")));
        }
        if state.dirs.contains(remote) {
            return Err(TransportError::Sftp(format!("is a directory: {remote}")));
        }
        let parent = remote_parent(remote).unwrap_or(".");
        if parent != "." && !state.dirs.contains(parent) {
            return Err(TransportError::Sftp(format!("no such directory: {parent}")));
        }
        state.files.insert(remote.to_string(), data);
        Ok(())
    }

    fn run(&self, command: &str) -> Result<CommandOutput, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Exec(command.to_string()));
        if state.fail_commands.contains(command) {
            return Err(TransportError::Failed(format!("injected failure: {command}")));
        }
        Ok(state
            .responses
            .get(command)
            .cloned()
            .unwrap_or(CommandOutput {
                output: String::new(),
                exit_status: Some(0),
            }))
    }
}

impl RemoteTransport for MemoryTransport {
    fn stat<'a>(&'a self, path: &'a str) -> TransportFuture<'a, Option<RemoteEntryKind>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.ops.push(Op::Stat(path.to_string()));
            if state.dirs.contains(path) {
                Ok(Some(RemoteEntryKind::Directory))
            } else if state.files.contains_key(path) {
                Ok(Some(RemoteEntryKind::File))
            } else {
                Ok(None)
            }
        })
    }

    fn create_dir<'a>(&'a self, path: &'a str) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.ops.push(Op::CreateDir(path.to_string()));
            if state.fail_create_dirs.contains(path) {
                return Err(TransportError::Failed(format!("injected failure: {path}")));
            }
            if state.racing_create_dirs.contains(path) {
                state.dirs.insert(path.to_string());
                return Err(TransportError::Sftp(format!("already exists: {path}")));
            }
            if state.dirs.contains(path) || state.files.contains_key(path) {
                return Err(TransportError::Sftp(format!("already exists: {path}")));
            }
            if let Some(parent) = remote_parent(path)
                && !state.dirs.contains(parent)
            {
                return Err(TransportError::Sftp(format!("no such directory: {parent}")));
            }
            state.dirs.insert(path.to_string());
            Ok(())
        })
    }

    fn upload_file<'a>(&'a self, local: &'a Path, remote: &'a str) -> TransportFuture<'a, u64> {
        Box::pin(async move {
            self.state
                .lock()
                .unwrap()
                .ops
                .push(Op::Upload(remote.to_string()));
            let data = tokio::fs::read(local).await?;
            let len = data.len() as u64;
            self.store(remote, data)?;
            Ok(len)
        })
    }

    fn write_file<'a>(&'a self, remote: &'a str, contents: &'a [u8]) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            self.state
                .lock()
                .unwrap()
                .ops
                .push(Op::Write(remote.to_string()));
            self.store(remote, contents.to_vec())
        })
    }

    fn exec<'a>(&'a self, command: &'a str) -> TransportFuture<'a, CommandOutput> {
        Box::pin(async move { self.run(command) })
    }

    fn exec_streaming<'a>(
        &'a self,
        command: &'a str,
        lines: mpsc::Sender<String>,
    ) -> TransportFuture<'a, Option<u32>> {
        Box::pin(async move {
            let result = self.run(command)?;
            for line in result.output.lines() {
                let _ = lines.send(line.to_string()).await;
            }
            Ok(result.exit_status)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_dir_is_idempotent() {
        let remote = MemoryTransport::new();

        assert!(remote.ensure_dir("/r").await.unwrap());
        assert!(!remote.ensure_dir("/r").await.unwrap());
        assert!(!remote.ensure_dir("/r").await.unwrap());

        let creates = remote
            .ops()
            .into_iter()
            .filter(|op| matches!(op, Op::CreateDir(_)))
            .count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn ensure_dir_rejects_file() {
        let remote = MemoryTransport::new().with_file("/r", b"not a dir");
        let err = remote.ensure_dir("/r").await.unwrap_err();
        assert!(matches!(err, TransportError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn ensure_dir_tolerates_lost_create_race() {
        let remote = MemoryTransport::new();
        remote.race_create_dir("/r");

        assert!(!remote.ensure_dir("/r").await.unwrap());
        assert_eq!(
            remote.ops(),
            vec![
                Op::Stat("/r".into()),
                Op::CreateDir("/r".into()),
                Op::Stat("/r".into()),
            ]
        );
    }

    #[tokio::test]
    async fn create_dir_requires_parent() {
        let remote = MemoryTransport::new();
        assert!(remote.create_dir("/a/b").await.is_err());
        assert!(remote.create_dir("/a").await.is_ok());
        assert!(remote.create_dir("/a/b").await.is_ok());
    }

    #[tokio::test]
    async fn streaming_forwards_lines() {
        let remote = MemoryTransport::new();
        remote.respond("build", "step 1\nstep 2", 3);

        let (tx, mut rx) = mpsc::channel(8);
        let status = remote.exec_streaming("build", tx).await.unwrap();
        assert_eq!(status, Some(3));
        assert_eq!(rx.recv().await.as_deref(), Some("step 1"));
        assert_eq!(rx.recv().await.as_deref(), Some("step 2"));
        assert_eq!(rx.recv().await, None);
    }
}
