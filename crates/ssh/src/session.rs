//! Authenticated SSH session with an SFTP channel.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use russh::client::{self, Handle};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg, Disconnect};
use russh_sftp::client::SftpSession;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::protocol::StatusCode;
use shipwright_uploader::{
    CommandOutput, RemoteEntryKind, RemoteTransport, TransportError, TransportFuture,
};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SshConfig;
use crate::lines::LineSplitter;
use crate::scope::run_scoped;

/// Client handler that accepts any host key, mirroring an auto-add policy.
struct AcceptHostKey {
    host: String,
}

impl client::Handler for AcceptHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        debug!(host = %self.host, "accepting server host key");
        Ok(true)
    }
}

/// An open SSH session plus its SFTP subsystem.
pub struct SshTransport {
    handle: Handle<AcceptHostKey>,
    sftp: SftpSession,
    pty: bool,
    target: String,
}

impl SshTransport {
    /// Connects, authenticates with password and opens SFTP.
    pub async fn connect(config: &SshConfig) -> Result<Self, TransportError> {
        let target = config.to_string();
        info!(target = %target, "connecting");

        let client_config = Arc::new(client::Config::default());
        let handler = AcceptHostKey {
            host: config.host.clone(),
        };

        let connect = client::connect(
            client_config,
            (config.host.as_str(), config.port),
            handler,
        );
        let mut handle = tokio::time::timeout(config.connect_timeout(), connect)
            .await
            .map_err(|_| {
                TransportError::Ssh(format!(
                    "connection to {} timed out after {}s",
                    config.address(),
                    config.connect_timeout_secs
                ))
            })?
            .map_err(ssh_err)?;

        let auth = handle
            .authenticate_password(config.user.as_str(), config.password.as_str())
            .await
            .map_err(ssh_err)?;
        if !auth.success() {
            return Err(TransportError::Auth(config.user.clone()));
        }

        let channel = handle.channel_open_session().await.map_err(ssh_err)?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(ssh_err)?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(sftp_err)?;

        info!(target = %target, "session established");

        Ok(Self {
            handle,
            sftp,
            pty: config.pty,
            target,
        })
    }

    /// Closes the SFTP channel and disconnects.
    pub async fn close(self) -> Result<(), TransportError> {
        if let Err(e) = self.sftp.close().await {
            warn!(target = %self.target, error = %e, "sftp close failed");
        }
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(ssh_err)?;
        debug!(target = %self.target, "disconnected");
        Ok(())
    }

    /// Opens a fresh channel and starts `command` on it.
    async fn start_exec(&self, command: &str) -> Result<Channel<client::Msg>, TransportError> {
        let channel = self.handle.channel_open_session().await.map_err(ssh_err)?;
        if self.pty {
            channel
                .request_pty(false, "xterm", 200, 50, 0, 0, &[])
                .await
                .map_err(ssh_err)?;
        }
        channel.exec(true, command).await.map_err(ssh_err)?;
        debug!(command, pty = self.pty, "exec started");
        Ok(channel)
    }
}

/// Opens a session, runs `body`, and closes the session on every exit path.
///
/// A close failure after a successful body is logged, not returned.
pub async fn with_session<T, E, F>(config: &SshConfig, body: F) -> Result<T, E>
where
    E: From<TransportError>,
    F: for<'t> FnOnce(
        &'t SshTransport,
    ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 't>>,
{
    let transport = SshTransport::connect(config).await?;
    run_scoped(transport, body, SshTransport::close).await
}

impl RemoteTransport for SshTransport {
    fn stat<'a>(&'a self, path: &'a str) -> TransportFuture<'a, Option<RemoteEntryKind>> {
        Box::pin(async move {
            match self.sftp.metadata(path).await {
                Ok(meta) if meta.is_dir() => Ok(Some(RemoteEntryKind::Directory)),
                Ok(meta) if meta.is_regular() => Ok(Some(RemoteEntryKind::File)),
                Ok(_) => Ok(Some(RemoteEntryKind::Other)),
                Err(e) if is_not_found(&e) => Ok(None),
                Err(e) => Err(sftp_err(e)),
            }
        })
    }

    fn create_dir<'a>(&'a self, path: &'a str) -> TransportFuture<'a, ()> {
        Box::pin(async move { self.sftp.create_dir(path).await.map_err(sftp_err) })
    }

    fn upload_file<'a>(&'a self, local: &'a Path, remote: &'a str) -> TransportFuture<'a, u64> {
        Box::pin(async move {
            let mut source = tokio::fs::File::open(local).await?;
            let mut dest = self.sftp.create(remote).await.map_err(sftp_err)?;
            let written = tokio::io::copy(&mut source, &mut dest).await?;
            dest.shutdown().await?;
            Ok(written)
        })
    }

    fn write_file<'a>(&'a self, remote: &'a str, contents: &'a [u8]) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            let mut dest = self.sftp.create(remote).await.map_err(sftp_err)?;
            dest.write_all(contents).await?;
            dest.shutdown().await?;
            Ok(())
        })
    }

    fn exec<'a>(&'a self, command: &'a str) -> TransportFuture<'a, CommandOutput> {
        Box::pin(async move {
            let mut channel = self.start_exec(command).await?;
            let mut raw = Vec::new();
            let mut exit_status = None;
            while let Some(msg) = channel.wait().await {
                match msg {
                    ChannelMsg::Data { ref data } | ChannelMsg::ExtendedData { ref data, .. } => {
                        raw.extend_from_slice(data);
                    }
                    ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                    _ => {}
                }
            }
            debug!(command, ?exit_status, "exec finished");
            Ok(CommandOutput {
                output: String::from_utf8_lossy(&raw).trim().to_string(),
                exit_status,
            })
        })
    }

    fn exec_streaming<'a>(
        &'a self,
        command: &'a str,
        lines: mpsc::Sender<String>,
    ) -> TransportFuture<'a, Option<u32>> {
        Box::pin(async move {
            let mut splitter = LineSplitter::new();
            let mut channel = self.start_exec(command).await?;

            let mut exit_status = None;
            while let Some(msg) = channel.wait().await {
                match msg {
                    ChannelMsg::Data { ref data } | ChannelMsg::ExtendedData { ref data, .. } => {
                        for line in splitter.push(data) {
                            let _ = lines.send(line).await;
                        }
                    }
                    ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                    _ => {}
                }
            }
            if let Some(tail) = splitter.finish() {
                let _ = lines.send(tail).await;
            }

            debug!(command, ?exit_status, "streaming exec finished");
            Ok(exit_status)
        })
    }
}

fn is_not_found(e: &SftpError) -> bool {
    matches!(e, SftpError::Status(status) if status.status_code == StatusCode::NoSuchFile)
}

fn ssh_err(e: russh::Error) -> TransportError {
    match e {
        russh::Error::IO(io) => TransportError::Io(io),
        russh::Error::Disconnect | russh::Error::SendError => TransportError::Closed,
        other => TransportError::Ssh(other.to_string()),
    }
}

fn sftp_err(e: SftpError) -> TransportError {
    TransportError::Sftp(e.to_string())
}
