//! Data types for the deploy flow.

use std::path::PathBuf;

use shipwright_uploader::{DEFAULT_PROGRESS_INTERVAL, ExclusionSet, UploadEvent, UploadReport};

use crate::compose::ComposeSpec;
use crate::env::EnvSpec;

/// Names excluded from every upload unless the plan overrides them.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules",
    ".next",
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    ".env",
];

/// Everything needed to deploy one project to one host.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub local_dir: PathBuf,
    /// Absolute remote project directory.
    pub remote_dir: String,
    pub exclusions: ExclusionSet,
    /// Extra directories (relative to `remote_dir`) created up front,
    /// even if no uploaded file lands in them.
    pub ensure_dirs: Vec<String>,
    pub env: EnvSpec,
    pub compose: ComposeSpec,
    pub progress_interval: usize,
    /// Where the app will be reachable, for the final summary.
    pub app_url: Option<String>,
}

impl DeployPlan {
    pub fn new(local_dir: impl Into<PathBuf>, remote_dir: impl Into<String>) -> Self {
        Self {
            local_dir: local_dir.into(),
            remote_dir: remote_dir.into(),
            exclusions: DEFAULT_EXCLUDES.iter().copied().collect(),
            ensure_dirs: Vec::new(),
            env: EnvSpec::default(),
            compose: ComposeSpec::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            app_url: None,
        }
    }
}

/// Pipeline stage, announced before it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    Scan,
    PrepareRemote,
    Upload,
    WriteEnv,
    ComposeUp,
    ComposeStatus,
}

impl std::fmt::Display for DeployStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DeployStep::Scan => "Scanning files",
            DeployStep::PrepareRemote => "Preparing remote directory",
            DeployStep::Upload => "Uploading files",
            DeployStep::WriteEnv => "Writing environment file",
            DeployStep::ComposeUp => "Building and starting containers",
            DeployStep::ComposeStatus => "Container status",
        };
        f.write_str(label)
    }
}

/// Progress event emitted during deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEvent {
    Step(DeployStep),
    /// Forwarded from the uploader.
    Upload(UploadEvent),
    EnvWritten { path: String },
    /// One line of compose build output.
    Output(String),
    ComposeFinished { exit_status: Option<u32> },
    /// Final container listing.
    Status(String),
}

/// Result of a deployment that ran to completion.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub upload: UploadReport,
    pub env_path: String,
    pub compose_status: Option<u32>,
    pub status_output: String,
    pub app_url: Option<String>,
}

impl DeployOutcome {
    /// True if every file uploaded and compose exited 0.
    pub fn is_success(&self) -> bool {
        self.upload.is_success() && self.compose_status == Some(0)
    }
}
