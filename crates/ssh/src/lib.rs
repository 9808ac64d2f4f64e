//! SSH/SFTP implementation of [`RemoteTransport`].
//!
//! One [`SshTransport`] wraps one authenticated session and one SFTP
//! subsystem channel. Commands run on their own session channels.
//! Use [`with_session`] to guarantee the session is closed on every
//! exit path.
//!
//! [`RemoteTransport`]: shipwright_uploader::RemoteTransport

mod config;
mod lines;
mod scope;
mod session;

pub use config::SshConfig;
pub use lines::LineSplitter;
pub use session::{SshTransport, with_session};
