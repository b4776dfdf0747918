pub mod api;
pub mod config;
pub mod error;
pub mod event;
pub mod job;
pub mod logging;
pub mod runner;
pub mod signature;
pub mod sync;
pub mod updater;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use config::DeployConfig;
use job::DeployHistory;
use runner::{CommandRunner, SystemCommandRunner};
use signature::SignatureVerifier;
use sync::Synchronizer;
use updater::PostSyncUpdater;

pub struct AppState {
    pub verifier: SignatureVerifier,
    pub synchronizer: Synchronizer,
    /// Full reference of the deployment branch, e.g. `refs/heads/deploy`
    pub branch_ref: String,
    pub history: Mutex<DeployHistory>,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wires the components for `config`, running external commands through `runner`.
    pub fn new(config: &DeployConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let updater = PostSyncUpdater::new(
            config.container.clone(),
            config.update_command.clone(),
            runner.clone(),
        );
        let target = config.target();
        let branch_ref = target.branch_ref();
        let synchronizer = Synchronizer::new(target, runner, updater)
            .with_reload_after_clone(config.reload_after_clone);

        Self {
            verifier: SignatureVerifier::new(config.webhook_secret.clone()),
            synchronizer,
            branch_ref,
            history: Mutex::new(DeployHistory::default()),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Same as [`AppState::new`] with real child processes.
    pub fn from_config(config: &DeployConfig) -> Self {
        let runner = SystemCommandRunner::new(Duration::from_secs(config.command_timeout_secs));
        Self::new(config, Arc::new(runner))
    }
}

pub type SharedState = Arc<AppState>;
