//! Remote readiness check.
//!
//! Runs read-only diagnostics over an open session and records what
//! each one printed. A failing command never stops the check.

use serde::{Deserialize, Serialize};
use shipwright_uploader::RemoteTransport;
use tracing::{debug, warn};

/// A titled group of diagnostic commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSection {
    pub title: String,
    pub commands: Vec<String>,
}

impl CheckSection {
    pub fn new(title: impl Into<String>, commands: &[&str]) -> Self {
        Self {
            title: title.into(),
            commands: commands.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// The stock diagnostics: OS, docker, portainer, disk, project dirs.
pub fn default_sections(home_dir: &str) -> Vec<CheckSection> {
    let list_home = format!("ls {home_dir}/ 2>/dev/null");
    vec![
        CheckSection::new("System", &["uname -a", "cat /etc/os-release | head -5"]),
        CheckSection::new(
            "Docker",
            &[
                "docker --version",
                "docker compose version 2>/dev/null || docker-compose --version 2>/dev/null",
            ],
        ),
        CheckSection::new(
            "Portainer",
            &[
                "docker ps --format \"table {{.Names}}\\t{{.Status}}\\t{{.Ports}}\" | grep -i portainer || echo \"Portainer not found as a container\"",
            ],
        ),
        CheckSection::new("Disk", &["df -h / | tail -1"]),
        CheckSection::new(
            "Project directories",
            &["ls /opt/ 2>/dev/null || echo \"/opt does not exist\"", list_home.as_str()],
        ),
    ]
}

/// Result of one diagnostic command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCheck {
    pub command: String,
    pub output: String,
    pub exit_status: Option<u32>,
    /// Transport-level failure, if the command could not be run at all.
    pub error: Option<String>,
}

impl CommandCheck {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.exit_status == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionReport {
    pub title: String,
    pub results: Vec<CommandCheck>,
}

/// Outcome of a readiness check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Set once checks run over an open session.
    pub reachable: bool,
    pub sections: Vec<SectionReport>,
}

impl CheckReport {
    pub fn all_succeeded(&self) -> bool {
        self.sections
            .iter()
            .flat_map(|s| &s.results)
            .all(CommandCheck::succeeded)
    }

    pub fn failed_commands(&self) -> Vec<&CommandCheck> {
        self.sections
            .iter()
            .flat_map(|s| &s.results)
            .filter(|c| !c.succeeded())
            .collect()
    }
}

/// Runs every section in order and collects the results.
pub async fn check_host(transport: &dyn RemoteTransport, sections: &[CheckSection]) -> CheckReport {
    let mut report = CheckReport {
        reachable: true,
        sections: Vec::with_capacity(sections.len()),
    };

    for section in sections {
        debug!(section = %section.title, "running checks");
        let mut results = Vec::with_capacity(section.commands.len());

        for command in &section.commands {
            let result = match transport.exec(command).await {
                Ok(out) => CommandCheck {
                    command: command.clone(),
                    output: out.output,
                    exit_status: out.exit_status,
                    error: None,
                },
                Err(e) => {
                    warn!(command = %command, error = %e, "check command failed");
                    CommandCheck {
                        command: command.clone(),
                        output: String::new(),
                        exit_status: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        report.sections.push(SectionReport {
            title: section.title.clone(),
            results,
        });
    }

    report
}
