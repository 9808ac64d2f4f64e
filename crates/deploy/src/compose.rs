//! Container-orchestration command lines.

use serde::{Deserialize, Serialize};

/// How the compose project is built and started on the remote host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeSpec {
    /// Compose invocation, e.g. `docker compose` or `docker-compose`.
    #[serde(default = "default_program")]
    pub program: String,

    /// Rebuild images before starting.
    #[serde(default = "default_true")]
    pub build: bool,

    /// Start containers in the background.
    #[serde(default = "default_true")]
    pub detached: bool,
}

fn default_program() -> String {
    "docker compose".into()
}

fn default_true() -> bool {
    true
}

impl Default for ComposeSpec {
    fn default() -> Self {
        Self {
            program: default_program(),
            build: default_true(),
            detached: default_true(),
        }
    }
}

impl ComposeSpec {
    /// Build/start command, with stderr folded into stdout for streaming.
    pub fn up_command(&self, remote_dir: &str, env_file: &str) -> String {
        let mut cmd = format!(
            "cd {} && {} --env-file {} up",
            shell_quote(remote_dir),
            self.program,
            shell_quote(env_file)
        );
        if self.detached {
            cmd.push_str(" -d");
        }
        if self.build {
            cmd.push_str(" --build");
        }
        cmd.push_str(" 2>&1");
        cmd
    }

    /// Container status listing.
    pub fn ps_command(&self, remote_dir: &str) -> String {
        format!("cd {} && {} ps", shell_quote(remote_dir), self.program)
    }
}

/// Single-quotes `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_up_command() {
        let cmd = ComposeSpec::default().up_command("/home/larry/rpg-platform", ".env");
        assert_eq!(
            cmd,
            "cd '/home/larry/rpg-platform' && docker compose --env-file '.env' up -d --build 2>&1"
        );
    }

    #[test]
    fn up_command_respects_flags() {
        let spec = ComposeSpec {
            program: "docker-compose".into(),
            build: false,
            detached: false,
        };
        assert_eq!(
            spec.up_command("/srv", ".env"),
            "cd '/srv' && docker-compose --env-file '.env' up 2>&1"
        );
    }

    #[test]
    fn ps_command_quotes_dir() {
        let cmd = ComposeSpec::default().ps_command("/srv/my app");
        assert_eq!(cmd, "cd '/srv/my app' && docker compose ps");
    }

    #[test]
    fn quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
