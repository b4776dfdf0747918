//! Execution of external commands (git, docker)

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info};

use crate::error::{DeployError, Result};

/// Captured result of a successful command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs an external command and reports whether it succeeded.
///
/// Implementations return an error for a command that cannot be started, exits
/// non-zero, or does not finish in time.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, argv: &[String], cwd: Option<&Path>) -> Result<CommandOutput>;
}

/// Runs commands as child processes, each bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    timeout: Duration,
}

impl SystemCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, argv: &[String], cwd: Option<&Path>) -> Result<CommandOutput> {
        let (program, args) = argv.split_first().ok_or(DeployError::EmptyCommand)?;
        let command_str = argv.join(" ");

        match cwd {
            Some(dir) => info!("Running (cwd = '{}'): {}", dir.display(), command_str),
            None => info!("Running: {}", command_str),
        }

        let mut cmd = Command::new(program);
        cmd.args(args).kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                error!("{} failed to start: {}", command_str, source);
                return Err(DeployError::CommandSpawn {
                    command: command_str,
                    source,
                });
            }
            Err(_) => {
                error!(
                    "{} timed out after {}s",
                    command_str,
                    self.timeout.as_secs()
                );
                return Err(DeployError::CommandTimeout {
                    command: command_str,
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            error!("{} failed:\n{}", command_str, stderr);
            return Err(DeployError::CommandFailed {
                command: command_str,
                code: output.status.code(),
                stderr,
            });
        }

        info!("{} output:\n{}", command_str, stdout);
        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(0),
            stdout,
            stderr,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_stdout_of_successful_command() {
        let runner = SystemCommandRunner::new(Duration::from_secs(10));
        let output = runner.run(&argv(&["echo", "deployed"]), None).await.unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout.trim(), "deployed");
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemCommandRunner::new(Duration::from_secs(10));
        let output = runner.run(&argv(&["pwd"]), Some(dir.path())).await.unwrap();
        let reported = std::fs::canonicalize(output.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let runner = SystemCommandRunner::new(Duration::from_secs(10));
        let err = runner.run(&argv(&["false"]), None).await.unwrap_err();
        assert!(matches!(err, DeployError::CommandFailed { code: Some(1), .. }));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let runner = SystemCommandRunner::new(Duration::from_secs(10));
        let err = runner
            .run(&argv(&["definitely-not-a-real-binary-4f2a"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::CommandSpawn { .. }));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let runner = SystemCommandRunner::new(Duration::from_millis(100));
        let err = runner.run(&argv(&["sleep", "5"]), None).await.unwrap_err();
        assert!(matches!(err, DeployError::CommandTimeout { .. }));
    }

    #[tokio::test]
    async fn empty_argv_is_rejected() {
        let runner = SystemCommandRunner::new(Duration::from_secs(1));
        let err = runner.run(&[], None).await.unwrap_err();
        assert!(matches!(err, DeployError::EmptyCommand));
    }
}
