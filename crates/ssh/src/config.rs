use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for one remote host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Seconds allowed for TCP connect plus handshake.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Request a pseudo-terminal for commands, which merges stderr into
    /// the output stream the way an interactive shell would.
    #[serde(default)]
    pub pty: bool,
}

fn default_port() -> u16 {
    22
}

fn default_connect_timeout() -> u64 {
    15
}

impl SshConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            user: user.into(),
            password: String::new(),
            connect_timeout_secs: default_connect_timeout(),
            pty: false,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// `host:port` for logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Never log the password.
impl std::fmt::Display for SshConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let cfg = SshConfig::new("192.168.0.225", "larry");
        assert_eq!(cfg.port, 22);
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.address(), "192.168.0.225:22");
        assert!(!cfg.pty);
    }

    #[test]
    fn display_omits_password() {
        let mut cfg = SshConfig::new("host", "user");
        cfg.password = "hunter2".into();
        let shown = cfg.to_string();
        assert_eq!(shown, "user@host:22");
        assert!(!shown.contains("hunter2"));
    }
}
