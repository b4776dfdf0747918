use std::sync::Arc;
use tracing::{error, info};

use crate::runner::CommandRunner;

/// Reloads the running application container after new code is checked out.
#[derive(Clone)]
pub struct PostSyncUpdater {
    container: String,
    update_command: Vec<String>,
    runner: Arc<dyn CommandRunner>,
}

impl PostSyncUpdater {
    pub fn new(
        container: impl Into<String>,
        update_command: Vec<String>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            container: container.into(),
            update_command,
            runner,
        }
    }

    /// `docker exec <container> <update command...>`
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![
            "docker".to_string(),
            "exec".to_string(),
            self.container.clone(),
        ];
        argv.extend(self.update_command.iter().cloned());
        argv
    }

    /// Runs the update command. Returns false if it could not run or exited non-zero.
    pub async fn update(&self) -> bool {
        if self.update_command.is_empty() {
            error!("No update command configured for container '{}'", self.container);
            return false;
        }

        info!("Updating application inside container '{}'", self.container);
        match self.runner.run(&self.argv(), None).await {
            Ok(_) => {
                info!("Container '{}' updated", self.container);
                true
            }
            Err(e) => {
                error!("Container update failed: {}", e);
                false
            }
        }
    }
}
