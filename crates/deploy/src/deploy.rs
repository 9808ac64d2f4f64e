//! Deploy pipeline for a single host.
//!
//! Scans the project, uploads it, writes the environment file, then
//! runs the compose build and reports container status. Every remote
//! call is awaited in order over one transport handle.

use shipwright_uploader::{
    RemoteDirectoryCache, RemoteTransport, Uploader, remote_ancestors, remote_join,
    scan_files_for_upload,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::env::render_env_file;
use crate::error::DeployError;
use crate::types::{DeployEvent, DeployOutcome, DeployPlan, DeployStep};

/// Runs deploy plans against one remote host.
pub struct Deployer<'a> {
    transport: &'a dyn RemoteTransport,
}

impl<'a> Deployer<'a> {
    pub fn new(transport: &'a dyn RemoteTransport) -> Self {
        Self { transport }
    }

    /// Runs the full pipeline.
    ///
    /// Per-file upload failures and a non-zero compose exit are reported
    /// in the outcome; only problems that make the remaining steps
    /// meaningless are returned as errors.
    pub async fn run(
        &self,
        plan: &DeployPlan,
        events_tx: &mpsc::Sender<DeployEvent>,
    ) -> Result<DeployOutcome, DeployError> {
        if !plan.remote_dir.starts_with('/') {
            return Err(DeployError::InvalidRemoteDir(plan.remote_dir.clone()));
        }
        // Rendered up front so a bad entry fails before anything is uploaded.
        let env_contents = render_env_file(&plan.env)?;

        // 1. Scan
        self.emit(events_tx, DeployEvent::Step(DeployStep::Scan)).await;
        let entries = scan_files_for_upload(&plan.local_dir, &plan.exclusions)?;

        // 2. Prepare remote
        self.emit(events_tx, DeployEvent::Step(DeployStep::PrepareRemote))
            .await;
        let mut known_dirs = self.prepare_remote(plan).await?;

        // 3. Upload
        self.emit(events_tx, DeployEvent::Step(DeployStep::Upload))
            .await;
        let uploader = Uploader::new(self.transport, plan.remote_dir.clone())
            .with_progress_interval(plan.progress_interval);

        let (upload_tx, mut upload_rx) = mpsc::channel(64);
        let upload = async {
            let report = uploader
                .upload_with_cache(&entries, &mut known_dirs, &upload_tx)
                .await;
            drop(upload_tx);
            report
        };
        let forward = async {
            while let Some(ev) = upload_rx.recv().await {
                self.emit(events_tx, DeployEvent::Upload(ev)).await;
            }
        };
        let (report, ()) = tokio::join!(upload, forward);

        // 4. Environment file
        self.emit(events_tx, DeployEvent::Step(DeployStep::WriteEnv))
            .await;
        let env_path = remote_join(&plan.remote_dir, &plan.env.file_name);
        self.transport
            .write_file(&env_path, env_contents.as_bytes())
            .await?;
        info!(path = %env_path, "environment file written");
        self.emit(
            events_tx,
            DeployEvent::EnvWritten {
                path: env_path.clone(),
            },
        )
        .await;

        // 5. Compose build + start
        self.emit(events_tx, DeployEvent::Step(DeployStep::ComposeUp))
            .await;
        let up = plan.compose.up_command(&plan.remote_dir, &plan.env.file_name);
        let (line_tx, mut line_rx) = mpsc::channel(256);
        let build = self.transport.exec_streaming(&up, line_tx);
        let stream = async {
            while let Some(line) = line_rx.recv().await {
                self.emit(events_tx, DeployEvent::Output(line)).await;
            }
        };
        let (compose_status, ()) = tokio::join!(build, stream);
        let compose_status = compose_status?;

        if compose_status == Some(0) {
            info!("compose finished");
        } else {
            warn!(exit_status = ?compose_status, "compose returned a failure status");
        }
        self.emit(
            events_tx,
            DeployEvent::ComposeFinished {
                exit_status: compose_status,
            },
        )
        .await;

        // 6. Status
        self.emit(events_tx, DeployEvent::Step(DeployStep::ComposeStatus))
            .await;
        let status = self
            .transport
            .exec(&plan.compose.ps_command(&plan.remote_dir))
            .await?;
        self.emit(events_tx, DeployEvent::Status(status.output.clone()))
            .await;

        Ok(DeployOutcome {
            upload: report,
            env_path,
            compose_status,
            status_output: status.output,
            app_url: plan.app_url.clone(),
        })
    }

    /// Creates the remote project directory and any requested subdirectories.
    ///
    /// Returns the confirmed directories so the upload can skip them.
    async fn prepare_remote(&self, plan: &DeployPlan) -> Result<RemoteDirectoryCache, DeployError> {
        let mut dirs = remote_ancestors(&plan.remote_dir);
        for extra in &plan.ensure_dirs {
            for dir in remote_ancestors(&remote_join(&plan.remote_dir, extra)) {
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }

        let mut known = RemoteDirectoryCache::new();
        for dir in dirs {
            self.transport.ensure_dir(&dir).await?;
            known.insert(dir);
        }
        Ok(known)
    }

    async fn emit(&self, events_tx: &mpsc::Sender<DeployEvent>, event: DeployEvent) {
        let _ = events_tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipwright_uploader::memory::{MemoryTransport, Op};
    use shipwright_uploader::UploadEvent;
    use std::fs;
    use tempfile::TempDir;

    const REMOTE: &str = "/home/larry/rpg-platform";

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("package.json"), b"{}").unwrap();
        fs::write(root.join("docker-compose.yml"), b"services: {}").unwrap();
        fs::write(root.join(".env"), b"LOCAL=1").unwrap();
        fs::create_dir_all(root.join("src").join("app")).unwrap();
        fs::write(root.join("src").join("app").join("page.tsx"), b"PAGE").unwrap();
        fs::create_dir_all(root.join("node_modules").join("next")).unwrap();
        fs::write(root.join("node_modules").join("next").join("index.js"), b"X").unwrap();
        dir
    }

    fn plan(dir: &TempDir) -> DeployPlan {
        let mut plan = DeployPlan::new(dir.path(), REMOTE);
        plan.ensure_dirs = vec!["prisma/migrations".into(), "public".into()];
        plan.env.vars = vec![("PORT".into(), "3200".into())];
        plan.env.generated = vec!["JWT_SECRET".into()];
        plan.app_url = Some("http://192.168.0.225:3200".into());
        plan
    }

    fn up_cmd() -> String {
        format!("cd '{REMOTE}' && docker compose --env-file '.env' up -d --build 2>&1")
    }

    fn ps_cmd() -> String {
        format!("cd '{REMOTE}' && docker compose ps")
    }

    fn drain(rx: &mut mpsc::Receiver<DeployEvent>) -> Vec<DeployEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn deploy_full_pipeline() {
        let dir = project();
        let remote = MemoryTransport::new();
        remote.respond(&up_cmd(), "Building web\nContainer web Started", 0);
        remote.respond(&ps_cmd(), "NAME  STATUS\nweb   Up 2 seconds", 0);

        let (tx, mut rx) = mpsc::channel(256);
        let outcome = Deployer::new(&remote)
            .run(&plan(&dir), &tx)
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.upload.uploaded_files, 3);
        assert_eq!(outcome.compose_status, Some(0));
        assert_eq!(outcome.status_output, "NAME  STATUS\nweb   Up 2 seconds");
        assert_eq!(outcome.env_path, format!("{REMOTE}/.env"));

        let files = remote.file_paths();
        assert!(files.contains(&format!("{REMOTE}/src/app/page.tsx")));
        assert!(!files.iter().any(|f| f.contains("node_modules")));

        let env = String::from_utf8(remote.file(&format!("{REMOTE}/.env")).unwrap()).unwrap();
        assert!(env.starts_with("PORT=3200\nJWT_SECRET="));
        assert_ne!(env, "LOCAL=1");

        let dirs = remote.dirs();
        assert!(dirs.contains(&format!("{REMOTE}/prisma/migrations")));
        assert!(dirs.contains(&format!("{REMOTE}/public")));

        assert_eq!(remote.executed(), vec![up_cmd(), ps_cmd()]);

        let events = drain(&mut rx);
        let steps: Vec<DeployStep> = events
            .iter()
            .filter_map(|e| match e {
                DeployEvent::Step(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(
            steps,
            vec![
                DeployStep::Scan,
                DeployStep::PrepareRemote,
                DeployStep::Upload,
                DeployStep::WriteEnv,
                DeployStep::ComposeUp,
                DeployStep::ComposeStatus,
            ]
        );
        assert!(events.contains(&DeployEvent::Output("Container web Started".into())));
        assert!(events.contains(&DeployEvent::Upload(UploadEvent::Finished {
            uploaded: 3,
            failed: 0
        })));
    }

    #[tokio::test]
    async fn env_written_after_upload_and_before_compose() {
        let dir = project();
        let remote = MemoryTransport::new();
        let (tx, _rx) = mpsc::channel(256);
        Deployer::new(&remote).run(&plan(&dir), &tx).await.unwrap();

        let ops = remote.ops();
        let pos = |pred: &dyn Fn(&Op) -> bool| ops.iter().position(pred).unwrap();
        let last_upload = ops
            .iter()
            .rposition(|op| matches!(op, Op::Upload(_)))
            .unwrap();
        let env_write = pos(&|op| matches!(op, Op::Write(_)));
        let first_exec = pos(&|op| matches!(op, Op::Exec(_)));

        assert!(last_upload < env_write);
        assert!(env_write < first_exec);
    }

    #[tokio::test]
    async fn compose_failure_still_reports_status() {
        let dir = project();
        let remote = MemoryTransport::new();
        remote.respond(&up_cmd(), "error: build failed", 17);
        remote.respond(&ps_cmd(), "NAME  STATUS", 0);

        let (tx, mut rx) = mpsc::channel(256);
        let outcome = Deployer::new(&remote).run(&plan(&dir), &tx).await.unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.compose_status, Some(17));
        assert_eq!(outcome.status_output, "NAME  STATUS");
        assert!(drain(&mut rx).contains(&DeployEvent::ComposeFinished {
            exit_status: Some(17)
        }));
    }

    #[tokio::test]
    async fn failed_file_does_not_abort_deploy() {
        let dir = project();
        let remote = MemoryTransport::new();
        remote.fail_upload(&format!("{REMOTE}/package.json"));

        let (tx, _rx) = mpsc::channel(256);
        let outcome = Deployer::new(&remote).run(&plan(&dir), &tx).await.unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.upload.uploaded_files, 2);
        assert_eq!(outcome.upload.failures[0].relative_path, "package.json");
        assert_eq!(remote.executed().len(), 2);
    }

    #[tokio::test]
    async fn missing_local_dir_touches_nothing_remote() {
        let remote = MemoryTransport::new();
        let plan = DeployPlan::new("/nonexistent/project", REMOTE);
        let (tx, _rx) = mpsc::channel(16);

        let err = Deployer::new(&remote).run(&plan, &tx).await.unwrap_err();
        assert!(matches!(err, DeployError::Upload(_)));
        assert!(remote.ops().is_empty());
    }

    #[tokio::test]
    async fn relative_remote_dir_is_rejected() {
        let dir = project();
        let remote = MemoryTransport::new();
        let plan = DeployPlan::new(dir.path(), "rpg-platform");
        let (tx, _rx) = mpsc::channel(16);

        let err = Deployer::new(&remote).run(&plan, &tx).await.unwrap_err();
        assert!(matches!(err, DeployError::InvalidRemoteDir(_)));
    }

    #[tokio::test]
    async fn blocked_remote_root_is_fatal() {
        let dir = project();
        let remote = MemoryTransport::new()
            .with_dir("/home/larry")
            .with_file(REMOTE, b"oops");
        let (tx, _rx) = mpsc::channel(16);

        let err = Deployer::new(&remote)
            .run(&plan(&dir), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Transport(_)));
        assert!(remote.executed().is_empty());
    }

    #[tokio::test]
    async fn invalid_env_aborts_before_upload() {
        let dir = project();
        let remote = MemoryTransport::new();
        let mut plan = plan(&dir);
        plan.env.vars.push(("BAD KEY".into(), "x".into()));
        let (tx, _rx) = mpsc::channel(256);

        let err = Deployer::new(&remote).run(&plan, &tx).await.unwrap_err();
        assert!(matches!(err, DeployError::InvalidEnv(_)));
        assert!(!remote.ops().iter().any(|op| matches!(op, Op::Upload(_))));
        assert!(remote.ops().is_empty());
    }

    #[tokio::test]
    async fn prepared_dirs_are_not_checked_again() {
        let dir = project();
        let remote = MemoryTransport::new();
        let (tx, _rx) = mpsc::channel(256);
        Deployer::new(&remote).run(&plan(&dir), &tx).await.unwrap();

        let root_stats = remote
            .ops()
            .into_iter()
            .filter(|op| matches!(op, Op::Stat(p) if p == REMOTE))
            .count();
        assert_eq!(root_stats, 1);
    }
}
