//! Keeps the local working copy in line with the remote deployment branch

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::DeploymentTarget;
use crate::runner::CommandRunner;
use crate::updater::PostSyncUpdater;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum SyncOutcome {
    /// Working copy was missing and has been cloned
    Cloned,
    /// Working copy was force-updated and the container reloaded
    Reset,
    CloneFailed,
    /// Fetch, reset or submodule update failed; working copy state is unknown
    SyncFailed,
    /// Code is at the new revision but the container reload failed
    UpdateFailed,
    Skipped(String),
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Cloned | SyncOutcome::Reset)
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Cloned => write!(f, "cloned"),
            SyncOutcome::Reset => write!(f, "reset"),
            SyncOutcome::CloneFailed => write!(f, "clone failed"),
            SyncOutcome::SyncFailed => write!(f, "sync failed"),
            SyncOutcome::UpdateFailed => write!(f, "update failed"),
            SyncOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
        }
    }
}

/// Brings the working copy of one deployment target up to the remote branch tip.
///
/// Concurrent calls to [`Synchronizer::sync`] are serialized.
pub struct Synchronizer {
    target: DeploymentTarget,
    runner: Arc<dyn CommandRunner>,
    updater: PostSyncUpdater,
    reload_after_clone: bool,
    lock: Mutex<()>,
}

impl Synchronizer {
    pub fn new(
        target: DeploymentTarget,
        runner: Arc<dyn CommandRunner>,
        updater: PostSyncUpdater,
    ) -> Self {
        Self {
            target,
            runner,
            updater,
            reload_after_clone: false,
            lock: Mutex::new(()),
        }
    }

    /// Also run the container update after a fresh clone.
    pub fn with_reload_after_clone(mut self, enabled: bool) -> Self {
        self.reload_after_clone = enabled;
        self
    }

    pub fn target(&self) -> &DeploymentTarget {
        &self.target
    }

    pub async fn sync(&self) -> SyncOutcome {
        let _guard = self.lock.lock().await;

        let repo_path = &self.target.repo_path;
        let present = tokio::fs::metadata(repo_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);

        if !present {
            warn!(
                "Directory does not exist: {}, cloning repo...",
                repo_path.display()
            );
            return self.clone_repo().await;
        }

        self.force_update(repo_path).await
    }

    async fn clone_repo(&self) -> SyncOutcome {
        let argv = vec![
            "git".to_string(),
            "clone".to_string(),
            "--recurse-submodules".to_string(),
            "-b".to_string(),
            self.target.branch.clone(),
            self.target.remote_url.clone(),
            self.target.repo_path.to_string_lossy().into_owned(),
        ];

        if let Err(e) = self.runner.run(&argv, None).await {
            error!("Git clone failed: {}", e);
            return SyncOutcome::CloneFailed;
        }
        info!("Repository cloned successfully");

        if self.reload_after_clone && !self.updater.update().await {
            return SyncOutcome::UpdateFailed;
        }
        SyncOutcome::Cloned
    }

    async fn force_update(&self, repo_path: &Path) -> SyncOutcome {
        let remote_branch = self.target.remote_branch();
        let steps = [
            (
                "Fetching latest code from remote",
                git_argv(&["fetch", "origin"]),
            ),
            (
                "Resetting working copy to remote branch",
                git_argv(&["reset", "--hard", remote_branch.as_str()]),
            ),
            (
                "Updating submodules",
                git_argv(&["submodule", "update", "--init", "--recursive"]),
            ),
        ];

        for (description, argv) in steps {
            info!("{}...", description);
            if let Err(e) = self.runner.run(&argv, Some(repo_path)).await {
                error!("Git operation failed: {}", e);
                return SyncOutcome::SyncFailed;
            }
        }

        if !self.updater.update().await {
            return SyncOutcome::UpdateFailed;
        }

        info!("Code, submodules, and application updated successfully");
        SyncOutcome::Reset
    }
}

fn git_argv(args: &[&str]) -> Vec<String> {
    std::iter::once("git")
        .chain(args.iter().copied())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::RecordingRunner;
    use std::path::PathBuf;

    const URL: &str = "git@example.com:org/app.git";

    fn synchronizer(repo_path: PathBuf, runner: Arc<RecordingRunner>) -> Synchronizer {
        let target = DeploymentTarget {
            repo_path,
            remote_url: URL.to_string(),
            branch: "deploy".to_string(),
        };
        let updater = PostSyncUpdater::new(
            "odoo-odoo-1",
            vec!["odoo".to_string(), "-u".to_string(), "all".to_string()],
            runner.clone(),
        );
        Synchronizer::new(target, runner, updater)
    }

    #[tokio::test]
    async fn missing_working_copy_is_cloned_and_nothing_else_runs() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("app");
        let runner = Arc::new(RecordingRunner::new());

        let outcome = synchronizer(repo.clone(), runner.clone()).sync().await;

        assert_eq!(outcome, SyncOutcome::Cloned);
        assert_eq!(
            runner.commands(),
            vec![format!(
                "git clone --recurse-submodules -b deploy {} {}",
                URL,
                repo.display()
            )]
        );
        assert_eq!(runner.invocations()[0].cwd, None);
    }

    #[tokio::test]
    async fn failed_clone_stops_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::failing_on("git clone"));

        let outcome = synchronizer(dir.path().join("app"), runner.clone())
            .sync()
            .await;

        assert_eq!(outcome, SyncOutcome::CloneFailed);
        assert_eq!(runner.invocations().len(), 1);
    }

    #[tokio::test]
    async fn clone_can_be_followed_by_reload() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let sync = synchronizer(dir.path().join("app"), runner.clone()).with_reload_after_clone(true);

        assert_eq!(sync.sync().await, SyncOutcome::Cloned);
        let commands = runner.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[1].starts_with("docker exec odoo-odoo-1"));

        let runner = Arc::new(RecordingRunner::failing_on("docker"));
        let sync = synchronizer(dir.path().join("other"), runner.clone()).with_reload_after_clone(true);
        assert_eq!(sync.sync().await, SyncOutcome::UpdateFailed);
    }

    #[tokio::test]
    async fn existing_working_copy_is_force_updated_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());

        let outcome = synchronizer(dir.path().to_path_buf(), runner.clone())
            .sync()
            .await;

        assert_eq!(outcome, SyncOutcome::Reset);
        assert_eq!(
            runner.commands(),
            vec![
                "git fetch origin",
                "git reset --hard origin/deploy",
                "git submodule update --init --recursive",
                "docker exec odoo-odoo-1 odoo -u all",
            ]
        );
        let invocations = runner.invocations();
        assert!(invocations[..3].iter().all(|i| i.cwd.as_deref() == Some(dir.path())));
        assert_eq!(invocations[3].cwd, None);
    }

    #[tokio::test]
    async fn failing_git_step_short_circuits() {
        for (failing, expected_runs) in [
            ("git fetch", 1),
            ("git reset", 2),
            ("git submodule", 3),
        ] {
            let dir = tempfile::tempdir().unwrap();
            let runner = Arc::new(RecordingRunner::failing_on(failing));

            let outcome = synchronizer(dir.path().to_path_buf(), runner.clone())
                .sync()
                .await;

            assert_eq!(outcome, SyncOutcome::SyncFailed, "failing on {}", failing);
            assert_eq!(runner.invocations().len(), expected_runs);
            assert!(!runner.commands().iter().any(|c| c.starts_with("docker")));
        }
    }

    #[tokio::test]
    async fn failing_container_update_is_update_failed() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::failing_on("docker exec"));

        let outcome = synchronizer(dir.path().to_path_buf(), runner.clone())
            .sync()
            .await;

        assert_eq!(outcome, SyncOutcome::UpdateFailed);
        assert_eq!(runner.invocations().len(), 4);
    }

    #[tokio::test]
    async fn concurrent_syncs_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let sync = Arc::new(synchronizer(dir.path().to_path_buf(), runner.clone()));

        let (a, b) = tokio::join!(sync.sync(), sync.sync());
        assert_eq!(a, SyncOutcome::Reset);
        assert_eq!(b, SyncOutcome::Reset);

        let commands = runner.commands();
        assert_eq!(commands.len(), 8);
        assert_eq!(commands[..4], commands[4..]);
    }

    #[test]
    fn outcome_display_and_success() {
        assert!(SyncOutcome::Cloned.is_success());
        assert!(!SyncOutcome::UpdateFailed.is_success());
        assert_eq!(
            SyncOutcome::Skipped("Ignored event: ping".to_string()).to_string(),
            "skipped (Ignored event: ping)"
        );
    }
}
