//! Deployment configuration.
//!
//! Stored as TOML, `./shipwright.toml` by default:
//!
//! ```toml
//! [ssh]
//! host = "192.168.0.225"
//! user = "larry"
//! password = "..."
//!
//! [deploy]
//! local_dir = "C:/rpg-platform"
//! remote_dir = "/home/larry/rpg-platform"
//! app_url = "http://192.168.0.225:3200"
//!
//! [deploy.env]
//! vars = [["PORT", "3200"], ["NODE_ENV", "production"]]
//! generated = ["JWT_SECRET"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use shipwright_deploy::{CheckSection, ComposeSpec, DEFAULT_EXCLUDES, DeployPlan, EnvSpec};
use shipwright_ssh::SshConfig;

/// Default configuration file name, also excluded from uploads.
pub const DEFAULT_CONFIG_FILE: &str = "shipwright.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub ssh: SshConfig,

    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub check: CheckConfig,
}

/// What to upload and how to start it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,

    #[serde(default)]
    pub remote_dir: String,

    /// Path segment names never uploaded.
    #[serde(default = "default_excludes")]
    pub exclude: Vec<String>,

    /// Remote subdirectories to create even when empty.
    #[serde(default)]
    pub ensure_dirs: Vec<String>,

    /// Files between progress lines.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,

    /// Request a PTY for the compose build so its output interleaves as
    /// it would in a terminal.
    #[serde(default = "default_true")]
    pub pty: bool,

    #[serde(default)]
    pub env: EnvSpec,

    #[serde(default)]
    pub compose: ComposeSpec,
}

/// Readiness check settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Home directory listed by the stock checks (`/home/<user>` if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_dir: Option<String>,

    /// Replaces the stock checks when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<CheckSection>,
}

fn default_local_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_excludes() -> Vec<String> {
    DEFAULT_EXCLUDES
        .iter()
        .copied()
        .chain([DEFAULT_CONFIG_FILE])
        .map(String::from)
        .collect()
}

fn default_progress_interval() -> usize {
    20
}

fn default_true() -> bool {
    true
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            local_dir: default_local_dir(),
            remote_dir: String::new(),
            exclude: default_excludes(),
            ensure_dirs: Vec::new(),
            progress_interval: default_progress_interval(),
            app_url: None,
            pty: default_true(),
            env: EnvSpec::default(),
            compose: ComposeSpec::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ssh: SshConfig::new("", ""),
            deploy: DeployConfig::default(),
            check: CheckConfig::default(),
        }
    }
}

impl Config {
    /// Loads and validates configuration from `path`.
    ///
    /// If the file does not exist, a template is written there and an
    /// error asks the user to fill it in.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            Config::default().save(path)?;
            bail!(
                "no configuration found; a template was written to {}, fill in [ssh] and [deploy]",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // The file holds the SSH password.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Checks the fields every command needs.
    pub fn validate_ssh(&self) -> anyhow::Result<()> {
        if self.ssh.host.trim().is_empty() {
            bail!("[ssh] host is empty");
        }
        if self.ssh.user.trim().is_empty() {
            bail!("[ssh] user is empty");
        }
        Ok(())
    }

    /// Checks the fields `deploy` needs.
    pub fn validate_deploy(&self) -> anyhow::Result<()> {
        self.validate_ssh()?;
        if !self.deploy.remote_dir.starts_with('/') {
            bail!(
                "[deploy] remote_dir must be an absolute path, got {:?}",
                self.deploy.remote_dir
            );
        }
        if self.deploy.progress_interval == 0 {
            bail!("[deploy] progress_interval must be at least 1");
        }
        Ok(())
    }

    /// SSH settings for a deploy run.
    pub fn deploy_ssh(&self) -> SshConfig {
        SshConfig {
            pty: self.deploy.pty,
            ..self.ssh.clone()
        }
    }

    /// Builds the deploy plan.
    pub fn deploy_plan(&self) -> DeployPlan {
        let d = &self.deploy;
        DeployPlan {
            exclusions: d.exclude.iter().cloned().collect(),
            ensure_dirs: d.ensure_dirs.clone(),
            env: d.env.clone(),
            compose: d.compose.clone(),
            progress_interval: d.progress_interval,
            app_url: d.app_url.clone(),
            ..DeployPlan::new(d.local_dir.clone(), d.remote_dir.clone())
        }
    }

    /// Check sections, falling back to the stock ones.
    pub fn check_sections(&self) -> Vec<CheckSection> {
        if !self.check.sections.is_empty() {
            return self.check.sections.clone();
        }
        let home = self
            .check
            .home_dir
            .clone()
            .unwrap_or_else(|| format!("/home/{}", self.ssh.user));
        shipwright_deploy::default_sections(&home)
    }
}
